//! Supporting services

pub mod logging;
