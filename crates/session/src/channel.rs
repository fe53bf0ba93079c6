//! The request/response seam between the driver and whatever carries calls
//! to the gateway.

use {async_trait::async_trait, serde_json::Value};

use crate::Result;

/// A bidirectional request/response channel to the gateway.
///
/// `request` fails on disconnect, timeout, or a remote `ok: false` response;
/// the driver treats every failure the same way.
#[async_trait]
pub trait GatewayChannel: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    /// Whether the underlying connection is currently up.
    fn is_connected(&self) -> bool {
        true
    }
}
