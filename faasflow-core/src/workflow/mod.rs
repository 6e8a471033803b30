//! State machine loading and execution

pub mod engine;
pub mod error;
pub mod executor;
pub mod gateway_invoker;
pub mod loader;
pub mod output;
pub mod policy;
pub mod validator;

pub use engine::*;
pub use error::*;
pub use executor::*;
pub use gateway_invoker::*;
pub use loader::*;
pub use output::*;
pub use validator::*;
