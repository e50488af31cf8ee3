pub mod files;
pub mod http;
pub mod onnx;
pub mod render;
pub mod v4l2;
pub mod video;
