pub mod composite;
pub mod config;
pub mod extent;
pub mod mask;
pub mod symbology;

pub use composite::*;
pub use config::*;
pub use mask::*;
pub use symbology::*;
