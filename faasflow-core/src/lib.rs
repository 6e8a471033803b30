//! # faasflow Core Library
//!
//! Declarative state-machine interpreter for serverless function workflows:
//! definition models and loading, the execution engine, and the function
//! gateway invoker.

pub mod models;
pub mod services;
pub mod workflow;
