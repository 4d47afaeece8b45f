use std::fmt::{Debug, Error, Formatter};

use ggez::mint::Point2;

use crate::basic::Dir;

/// A cell on the board, (0, 0) is the top-left corner
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Add, AddAssign, Sub)]
pub struct GridPoint {
    pub x: isize,
    pub y: isize,
}

impl Debug for GridPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "<{}, {}>", self.x, self.y)
    }
}

impl From<(isize, isize)> for GridPoint {
    fn from((x, y): (isize, isize)) -> Self {
        Self { x, y }
    }
}

impl GridPoint {
    #[must_use]
    pub fn translate(self, dir: Dir) -> Self {
        self + dir.unit()
    }
}

/// Dimensions of a square board
#[derive(Copy, Clone, Eq, PartialEq, Debug, From, Display)]
#[display(fmt = "{}x{}", _0, _0)]
pub struct GridDim(pub isize);

impl GridDim {
    pub fn side(self) -> isize {
        self.0
    }

    pub fn cell_count(self) -> usize {
        (self.0 * self.0) as usize
    }

    /// Whether `point` is in [0, side) on both axes
    pub fn contains(self, point: GridPoint) -> bool {
        (0..self.0).contains(&point.x) && (0..self.0).contains(&point.y)
    }

    pub fn center(self) -> GridPoint {
        GridPoint { x: self.0 / 2, y: self.0 / 2 }
    }
}

/// Screen-space position, a more convenient version of mint::Point2<f32>
#[derive(Copy, Clone, Debug, Add, AddAssign, Sub, SubAssign)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl From<Point> for Point2<f32> {
    fn from(Point { x, y }: Point) -> Self {
        Point2 { x, y }
    }
}

impl Point {
    pub fn of_cell(cell: GridPoint, cell_size: f32) -> Self {
        Self {
            x: cell.x as f32 * cell_size,
            y: cell.y as f32 * cell_size,
        }
    }
}

#[test]
fn test_translate() {
    use Dir::*;
    let head = GridPoint { x: 5, y: 5 };
    for (dir, expect) in [
        (Up, (5, 4)),
        (Down, (5, 6)),
        (Left, (4, 5)),
        (Right, (6, 5)),
    ] {
        assert_eq!(head.translate(dir), GridPoint::from(expect), "{:?}", dir);
    }
}

#[test]
fn test_contains() {
    let dim = GridDim(20);
    for (point, inside) in [
        ((0, 0), true),
        ((19, 19), true),
        ((10, 0), true),
        ((-1, 5), false),
        ((5, -1), false),
        ((20, 5), false),
        ((5, 20), false),
    ] {
        assert_eq!(dim.contains(GridPoint::from(point)), inside, "{:?}", point);
    }
}
