//! Function invoker trait

use crate::models::workflow::InvocationParams;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Dispatches a named function call and returns its response
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Invoke a function
    ///
    /// # Arguments
    /// * `function` - Function name, the name of the current state
    /// * `payload` - Request body
    /// * `params` - Invocation parameters fixed for the run
    ///
    /// # Returns
    /// Raw response bytes
    async fn invoke(&self, function: &str, payload: Bytes, params: &InvocationParams)
        -> Result<Bytes>;
}
