// src/models/mod.rs

pub mod certificate;
pub mod organization;
pub mod question;
pub mod session;
pub mod test_result;
pub mod user;
