mod coord;
mod vector;
mod rotation;

pub use coord::Coord;
pub use vector::{Vector, Dot};
pub use rotation::{Axis, Rotation};
