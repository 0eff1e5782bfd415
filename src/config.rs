//! Configuration and application assembly

pub mod seed;
pub mod settings;
pub mod urls;
