pub mod point;
pub mod vector;
pub mod transform;
