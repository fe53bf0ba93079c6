//! WebSocket client for the gateway, usable as a wizard [`GatewayChannel`].
//!
//! [`GatewayChannel`]: wizard_session::GatewayChannel

pub mod auth;
pub mod config;
mod connection;
pub mod error;
mod rpc;

use {
    std::sync::Arc,
    tokio::sync::mpsc,
    tracing::{debug, warn},
    wizard_protocol::{ConnectAuth, EventFrame, HelloOk, ResponseFrame},
};

pub use {
    config::{ClientConfig, GatewayConfig},
    connection::ConnectionManager,
    error::{Error, Result},
    rpc::RpcClient,
};

use connection::ConnectionEvent;

/// Connection state changes surfaced to the application.
#[derive(Debug)]
pub enum GatewayEvent {
    Connected(Box<HelloOk>),
    Disconnected,
    Error(String),
    /// A server-push event, passed through untouched.
    Event(Box<EventFrame>),
}

/// Connect to the gateway described by `config`.
///
/// Returns the RPC client immediately; the socket connects (and reconnects)
/// in the background and reports through the returned receiver. Responses are
/// routed to waiting calls and events are forwarded.
pub fn connect(
    config: &GatewayConfig,
    auth: ConnectAuth,
) -> (Arc<RpcClient>, mpsc::UnboundedReceiver<GatewayEvent>) {
    let (conn_tx, conn_rx) = mpsc::unbounded_channel();
    let connection = Arc::new(ConnectionManager::spawn(
        config.url.clone(),
        config.client_id.clone(),
        auth,
        conn_tx,
    ));
    let rpc = Arc::new(RpcClient::new(connection, config.rpc_timeout()));

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(route_events(Arc::clone(&rpc), conn_rx, event_tx));
    (rpc, event_rx)
}

async fn route_events(
    rpc: Arc<RpcClient>,
    mut conn_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    event_tx: mpsc::UnboundedSender<GatewayEvent>,
) {
    while let Some(event) = conn_rx.recv().await {
        let forward = match event {
            ConnectionEvent::Frame(text) => match parse_frame(&text) {
                Some(Incoming::Response(response)) => {
                    rpc.resolve_response(response).await;
                    continue;
                },
                Some(Incoming::Event(event)) => {
                    debug!(event = %event.event, seq = event.seq, "gateway event");
                    GatewayEvent::Event(Box::new(event))
                },
                None => {
                    debug!("ignoring unrecognised frame");
                    continue;
                },
            },
            ConnectionEvent::Connected(hello) => {
                if !hello.features.supports_wizard() {
                    warn!("gateway does not advertise the wizard methods");
                }
                GatewayEvent::Connected(hello)
            },
            ConnectionEvent::Disconnected => {
                rpc.fail_pending().await;
                GatewayEvent::Disconnected
            },
            ConnectionEvent::Error(message) => GatewayEvent::Error(message),
        };
        // Keep routing responses even if nobody listens for state changes.
        let _ = event_tx.send(forward);
    }
}

#[derive(Debug)]
enum Incoming {
    Response(ResponseFrame),
    Event(EventFrame),
}

fn parse_frame(text: &str) -> Option<Incoming> {
    if let Ok(response) = serde_json::from_str::<ResponseFrame>(text)
        && response.r#type == "res"
    {
        return Some(Incoming::Response(response));
    }
    if let Ok(event) = serde_json::from_str::<EventFrame>(text)
        && event.r#type == "event"
    {
        return Some(Incoming::Event(event));
    }
    None
}
