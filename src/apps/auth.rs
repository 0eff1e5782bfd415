//! Authentication: credentials, tokens and two-factor enrollment

pub mod hasher;
pub mod jwt;
pub mod serializers;
pub mod service;
pub mod totp;
pub mod urls;
pub mod views;
