pub use dir::Dir;
pub use point::{GridDim, GridPoint, Point};

pub mod board;
mod dir;
mod point;
