use {
    crate::{Error, connection::ConnectionManager},
    async_trait::async_trait,
    std::{collections::HashMap, sync::Arc, time::Duration},
    tokio::sync::{Mutex, oneshot},
    tracing::{debug, trace},
    wizard_protocol::{RequestFrame, ResponseFrame},
    wizard_session::GatewayChannel,
};

/// Correlates RPC request/response pairs by ID.
pub struct RpcClient {
    connection: Arc<ConnectionManager>,
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<ResponseFrame>>>>,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(connection: Arc<ConnectionManager>, timeout: Duration) -> Self {
        Self {
            connection,
            pending: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    /// Send an RPC request and wait for the matching response.
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        if !self.connection.is_connected() {
            return Err(Error::Connection("not connected to gateway".into()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let frame = RequestFrame::new(id.clone(), method, params);

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id.clone(), tx);
        }

        let json = serde_json::to_string(&frame).map_err(Error::Json)?;
        trace!(method, id = %id, "sending rpc request");
        self.connection.send_raw(json);

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => {
                if response.ok {
                    Ok(response.payload.unwrap_or(serde_json::Value::Null))
                } else {
                    let (code, message) = response
                        .error
                        .map(|e| (e.code, e.message))
                        .unwrap_or_else(|| (String::new(), "unknown RPC error".into()));
                    Err(Error::Remote { code, message })
                }
            },
            Ok(Err(_)) => {
                // oneshot sender dropped, connection closed
                self.pending.lock().await.remove(&id);
                Err(Error::Connection(
                    "connection closed during RPC call".into(),
                ))
            },
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(Error::Connection(format!(
                    "RPC call '{method}' timed out after {}s",
                    self.timeout.as_secs()
                )))
            },
        }
    }

    /// Called by the router when a response frame arrives.
    /// Routes it to the waiting `call()` if one exists.
    pub async fn resolve_response(&self, frame: ResponseFrame) {
        let mut pending = self.pending.lock().await;
        if let Some(tx) = pending.remove(&frame.id) {
            // Ignore send error, the caller may have timed out and dropped the receiver.
            let _ = tx.send(frame);
        } else {
            debug!(id = %frame.id, "response for unknown or expired request");
        }
    }

    /// Fail every outstanding call, e.g. after the socket dropped.
    pub async fn fail_pending(&self) {
        let mut pending = self.pending.lock().await;
        if !pending.is_empty() {
            debug!(count = pending.len(), "failing pending rpc calls");
        }
        pending.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}

#[async_trait]
impl GatewayChannel for RpcClient {
    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> wizard_session::Result<serde_json::Value> {
        Ok(self.call(method, params).await?)
    }

    fn is_connected(&self) -> bool {
        RpcClient::is_connected(self)
    }
}
