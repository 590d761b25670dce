// src/handlers/mod.rs

pub mod assignment;
pub mod auth;
pub mod progress;
pub mod quiz;
pub mod reference;
