//! Data models for faasflow

pub mod configuration;
pub mod workflow;

pub use configuration::*;
pub use workflow::*;
