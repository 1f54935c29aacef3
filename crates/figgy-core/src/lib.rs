//! Settings, errors, and the gateway data model shared by every Figgy crate.

pub mod config;
pub mod content;
pub mod error;
pub mod types;
