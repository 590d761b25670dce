// src/models/mod.rs

pub mod answer;
pub mod assignment;
pub mod progress;
pub mod question;
pub mod quiz;
pub mod role;
pub mod user;
