//! # clinica
//!
//! Multi-role REST backend for a medical clinic. Patients, specialists and
//! administrators manage appointments (`Cita`), clinical histories
//! (`HistoriaClinica`) and clinical records (`RegistroClinico`) behind JWT
//! authentication with optional TOTP two-factor verification.
//!
//! ## Layout
//!
//! - [`apps`]: one module per domain area, each split into `models`,
//!   `serializers`, a service module with the business rules, `views` and `urls`
//! - [`core`]: error type, request extractors, role gate, validators, logging
//! - [`db`]: the [`Store`](db::Store) abstraction with PostgreSQL and in-memory engines
//! - [`config`]: settings, router assembly and startup seeding
//! - [`storage`]: profile image storage

pub mod apps;
pub mod config;
pub mod core;
pub mod db;
pub mod state;
pub mod storage;

pub use crate::config::urls::routes;
pub use crate::core::error::{Error, Result};
pub use crate::state::AppState;
