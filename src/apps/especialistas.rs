//! Especialistas: clinician-role personas

pub mod models;
pub mod serializers;
pub mod service;
pub mod urls;
pub mod views;
