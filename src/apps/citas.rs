//! Citas: appointment scheduling

pub mod models;
pub mod scheduler;
pub mod serializers;
pub mod urls;
pub mod views;
