use crate::basic::{GridDim, GridPoint};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Collision {
    Wall,
    /// Head ran into the body segment at this index (never 0)
    Itself { segment_index: usize },
}

pub fn check_wall_collision(head: GridPoint, dim: GridDim) -> bool {
    !dim.contains(head)
}

/// Index of the first body segment (excluding the head itself)
/// that `head` lands on
pub fn check_self_collision<'a>(
    head: GridPoint,
    body: impl IntoIterator<Item = &'a GridPoint>,
) -> Option<usize> {
    body.into_iter()
        .enumerate()
        .skip(1)
        .find(|(_, segment)| **segment == head)
        .map(|(idx, _)| idx)
}

pub fn check_food_collision(head: GridPoint, food: GridPoint) -> bool {
    head == food
}

/// Fatal collisions only, wall takes precedence
pub fn find_collision<'a>(
    head: GridPoint,
    body: impl IntoIterator<Item = &'a GridPoint>,
    dim: GridDim,
) -> Option<Collision> {
    if check_wall_collision(head, dim) {
        return Some(Collision::Wall);
    }
    check_self_collision(head, body).map(|segment_index| Collision::Itself { segment_index })
}

#[test]
fn test_wall_collision() {
    let dim = GridDim(20);
    for (head, crash) in [
        ((0, 0), false),
        ((19, 0), false),
        ((0, 19), false),
        ((-1, 0), true),
        ((0, -1), true),
        ((20, 3), true),
        ((3, 20), true),
        ((-5, 25), true),
    ] {
        assert_eq!(check_wall_collision(GridPoint::from(head), dim), crash, "{:?}", head);
    }
}

#[test]
fn test_self_collision_ignores_head() {
    let body = [(4, 4), (3, 4), (3, 5), (4, 5)].map(GridPoint::from);
    // landing on the head's own cell is not a self collision
    assert_eq!(check_self_collision(body[0], &body), None);
    assert_eq!(check_self_collision(GridPoint::from((4, 5)), &body), Some(3));
    assert_eq!(check_self_collision(GridPoint::from((5, 5)), &body), None);
}

#[test]
fn test_find_collision() {
    let dim = GridDim(5);
    let body = [(0, 0), (1, 0), (1, 1)].map(GridPoint::from);
    assert_eq!(find_collision(GridPoint::from((-1, 0)), &body, dim), Some(Collision::Wall));
    assert_eq!(
        find_collision(GridPoint::from((1, 1)), &body, dim),
        Some(Collision::Itself { segment_index: 2 })
    );
    assert_eq!(find_collision(GridPoint::from((0, 1)), &body, dim), None);
    assert!(check_food_collision(GridPoint::from((2, 2)), GridPoint::from((2, 2))));
}
