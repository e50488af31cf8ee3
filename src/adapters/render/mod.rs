pub mod headless;
pub mod overlay;
