//! Registros clinicos: encounters inside a clinical history

pub mod models;
pub mod ownership;
pub mod serializers;
pub mod urls;
pub mod views;
