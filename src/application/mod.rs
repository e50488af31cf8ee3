pub mod cancel;
pub mod ports;
pub mod runner;
pub mod services;
