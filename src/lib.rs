pub mod audio;
#[cfg(feature = "desktop")]
pub mod camera;
pub mod config;
pub mod mapping;
pub mod music;
pub mod pose;
pub mod render;
pub mod session;
pub mod sim;
pub mod smooth;
pub mod zone;
