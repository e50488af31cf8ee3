pub mod alert;
pub mod annotation;
pub mod camera;
pub mod detection;
pub mod distance;
pub mod errors;
pub mod geometry;
pub mod model;
pub mod stream;
pub mod zone;
