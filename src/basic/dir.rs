use std::ops::Neg;

use crate::basic::GridPoint;
use Dir::*;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Neg for Dir {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            Up => Down,
            Down => Up,
            Left => Right,
            Right => Left,
        }
    }
}

impl Dir {
    #[cfg(test)]
    pub fn iter() -> impl Iterator<Item = Self> {
        [Up, Right, Down, Left].iter().copied()
    }

    /// One cell in this direction, y grows downwards
    pub fn unit(self) -> GridPoint {
        match self {
            Up => GridPoint { x: 0, y: -1 },
            Down => GridPoint { x: 0, y: 1 },
            Left => GridPoint { x: -1, y: 0 },
            Right => GridPoint { x: 1, y: 0 },
        }
    }

    pub fn is_reverse_of(self, other: Self) -> bool {
        self == -other
    }
}

#[test]
fn test_dir_reverse() {
    for dir in Dir::iter() {
        assert_eq!(-(-dir), dir);
        assert!(dir.is_reverse_of(-dir), "{:?} vs {:?}", dir, -dir);
        assert!(!dir.is_reverse_of(dir));

        let GridPoint { x, y } = dir.unit() + (-dir).unit();
        assert_eq!((x, y), (0, 0), "{:?} and its reverse should cancel out", dir);
    }
}
