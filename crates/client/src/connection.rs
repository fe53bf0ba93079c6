use {
    crate::{Error, Result},
    futures::{SinkExt, StreamExt},
    std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    },
    tokio::sync::mpsc,
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tracing::{debug, error, info},
    wizard_protocol::{
        ClientInfo, ConnectAuth, ConnectParams, HelloOk, PROTOCOL_VERSION, RequestFrame,
        ResponseFrame, methods, roles, scopes,
    },
};

/// Maximum reconnect backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Events sent from the connection task to the client.
#[derive(Debug)]
pub enum ConnectionEvent {
    Connected(Box<HelloOk>),
    Disconnected,
    Error(String),
    Frame(String),
}

/// Manages a WebSocket connection to the gateway, including handshake and
/// auto-reconnect with exponential backoff.
pub struct ConnectionManager {
    /// Send JSON text frames to the WebSocket writer task.
    write_tx: mpsc::UnboundedSender<String>,
    connected: Arc<AtomicBool>,
}

impl ConnectionManager {
    /// Spawn the connection task and return immediately.
    pub fn spawn(
        url: String,
        client_id: String,
        auth: ConnectAuth,
        event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Self {
        let (write_tx, write_rx) = mpsc::unbounded_channel::<String>();
        let connected = Arc::new(AtomicBool::new(false));

        let params = build_connect_params(&client_id, &auth);
        tokio::spawn(connection_loop(
            url,
            params,
            event_tx,
            write_rx,
            Arc::clone(&connected),
        ));

        Self {
            write_tx,
            connected,
        }
    }

    /// A manager with no socket behind it; frames go to `write_tx`.
    #[cfg(test)]
    pub(crate) fn detached(write_tx: mpsc::UnboundedSender<String>, connected: bool) -> Self {
        Self {
            write_tx,
            connected: Arc::new(AtomicBool::new(connected)),
        }
    }

    /// Send a raw JSON string through the WebSocket.
    pub fn send_raw(&self, json: String) {
        // Ignore send error; it means the connection loop has exited.
        let _ = self.write_tx.send(json);
    }

    /// Whether the handshake has completed on the current socket.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Build the `ConnectParams` for the protocol v3 handshake.
fn build_connect_params(client_id: &str, auth: &ConnectAuth) -> ConnectParams {
    ConnectParams {
        min_protocol: PROTOCOL_VERSION,
        max_protocol: PROTOCOL_VERSION,
        client: ClientInfo {
            id: client_id.to_string(),
            display_name: Some("Setup Wizard".into()),
            version: env!("CARGO_PKG_VERSION").into(),
            platform: std::env::consts::OS.into(),
            mode: roles::OPERATOR.into(),
            instance_id: Some(uuid::Uuid::new_v4().to_string()),
        },
        role: Some(roles::OPERATOR.into()),
        scopes: Some(vec![
            scopes::ADMIN.into(),
            scopes::READ.into(),
            scopes::WRITE.into(),
        ]),
        auth: Some(auth.clone()),
        user_agent: Some(format!("{client_id}/{}", env!("CARGO_PKG_VERSION"))),
    }
}

/// Main connection loop with auto-reconnect.
async fn connection_loop(
    url: String,
    params: ConnectParams,
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    mut write_rx: mpsc::UnboundedReceiver<String>,
    connected: Arc<AtomicBool>,
) {
    let mut backoff = Duration::from_secs(1);

    loop {
        let stale = discard_queued(&mut write_rx);
        if stale > 0 {
            debug!(count = stale, "dropping frames queued for a closed socket");
        }
        info!(url = %url, "connecting to gateway");

        let outcome = connect_and_run(&url, &params, &event_tx, &mut write_rx, &connected).await;
        connected.store(false, Ordering::Release);
        match outcome {
            Ok(Closed::ByServer) => debug!("connection closed by gateway"),
            Ok(Closed::ByClient) => {
                debug!("client dropped, stopping connection loop");
                return;
            },
            Err(e) => {
                error!(error = %e, "connection error");
                let _ = event_tx.send(ConnectionEvent::Error(e.to_string()));
            },
        }

        if event_tx.send(ConnectionEvent::Disconnected).is_err() {
            return;
        }

        info!(delay_ms = backoff.as_millis(), "reconnecting after delay");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Empty the outgoing queue so frames written for an earlier socket never
/// reach the next one.
fn discard_queued(write_rx: &mut mpsc::UnboundedReceiver<String>) -> usize {
    let mut count = 0;
    while write_rx.try_recv().is_ok() {
        count += 1;
    }
    count
}

enum Closed {
    ByServer,
    ByClient,
}

/// Single connection attempt: connect, handshake, then forward frames.
async fn connect_and_run(
    url: &str,
    params: &ConnectParams,
    event_tx: &mpsc::UnboundedSender<ConnectionEvent>,
    write_rx: &mut mpsc::UnboundedReceiver<String>,
    connected: &AtomicBool,
) -> Result<Closed> {
    let (ws_stream, _response) = connect_async(url).await?;
    let (mut ws_sink, mut ws_reader) = ws_stream.split();

    let connect_id = uuid::Uuid::new_v4().to_string();
    let connect_frame = RequestFrame::new(
        connect_id.clone(),
        methods::CONNECT,
        serde_json::to_value(params)?,
    );
    ws_sink
        .send(Message::Text(serde_json::to_string(&connect_frame)?.into()))
        .await?;

    let hello_ok = wait_for_hello(&mut ws_reader, &connect_id).await?;
    info!(
        server_version = %hello_ok.server.version,
        conn_id = %hello_ok.server.conn_id,
        wizard = hello_ok.features.supports_wizard(),
        "connected to gateway"
    );
    connected.store(true, Ordering::Release);
    let _ = event_tx.send(ConnectionEvent::Connected(Box::new(hello_ok)));

    loop {
        tokio::select! {
            msg = ws_reader.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = event_tx.send(ConnectionEvent::Frame(text.to_string()));
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(Closed::ByServer),
                    Some(Ok(Message::Ping(data))) => {
                        ws_sink.send(Message::Pong(data)).await?;
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => return Err(Error::WebSocket(e)),
                }
            },
            json = write_rx.recv() => {
                match json {
                    Some(text) => ws_sink.send(Message::Text(text.into())).await?,
                    None => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        return Ok(Closed::ByClient);
                    },
                }
            },
        }
    }
}

/// Wait for the `hello-ok` response to our `connect` request.
async fn wait_for_hello(
    reader: &mut (impl StreamExt<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
              + Unpin),
    connect_id: &str,
) -> Result<HelloOk> {
    let timeout = Duration::from_millis(wizard_protocol::HANDSHAKE_TIMEOUT_MS);

    let result = tokio::time::timeout(timeout, async {
        while let Some(msg) = reader.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Some(hello) = parse_hello(&text, connect_id)? {
                        return Ok(hello);
                    }
                },
                Ok(Message::Close(_)) => {
                    return Err(Error::Connection(
                        "server closed connection during handshake".into(),
                    ));
                },
                Ok(_) => {},
                Err(e) => return Err(Error::WebSocket(e)),
            }
        }
        Err(Error::Connection("connection closed before handshake".into()))
    })
    .await;

    result.unwrap_or_else(|_| Err(Error::Connection("handshake timed out".into())))
}

/// `Ok(None)` for frames that are not the response to `connect_id`.
fn parse_hello(text: &str, connect_id: &str) -> Result<Option<HelloOk>> {
    let Ok(frame) = serde_json::from_str::<ResponseFrame>(text) else {
        return Ok(None);
    };
    if frame.id != connect_id {
        return Ok(None);
    }
    if !frame.ok {
        let msg = frame
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| "unknown error".into());
        return Err(Error::Auth(msg));
    }
    let payload = frame
        .payload
        .ok_or_else(|| Error::Protocol("hello-ok response missing payload".into()))?;
    Ok(Some(serde_json::from_value(payload)?))
}
