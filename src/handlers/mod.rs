// src/handlers/mod.rs

pub mod attempts;
pub mod auth;
pub mod catalog;
pub mod certificate;
pub mod profile;
pub mod results;
