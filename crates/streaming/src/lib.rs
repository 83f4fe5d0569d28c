pub mod fetch;
pub mod image;
pub mod request;

pub use fetch::*;
pub use image::*;
pub use request::*;
