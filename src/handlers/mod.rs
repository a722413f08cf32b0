//! HTTP handlers

pub mod analyze;
pub mod datasets;
pub mod health;
pub mod reports;
