//! Personas: the identity shared by every role

pub mod models;
pub mod serializers;
pub mod service;
pub mod urls;
pub mod views;
