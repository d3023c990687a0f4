// src/remote/mod.rs

pub mod wordpress;

pub use wordpress::WordPressClient;
