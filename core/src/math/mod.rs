pub mod geometry;
pub mod sampling;

pub use geometry::polygon_contains;
pub use sampling::linspace_indices;
