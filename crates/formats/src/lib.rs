pub mod geofeature;

pub use geofeature::*;
