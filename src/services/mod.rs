// src/services/mod.rs

pub mod attempts;
pub mod catalog;
pub mod certificate;
pub mod results;
pub mod scoring;
pub mod session_manager;
