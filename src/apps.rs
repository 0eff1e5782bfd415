//! Domain applications

pub mod auth;
pub mod citas;
pub mod especialistas;
pub mod historias;
pub mod pacientes;
pub mod personas;
pub mod registros;
