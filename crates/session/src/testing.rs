//! In-memory channels for driving the session in tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use {
    async_trait::async_trait,
    serde_json::Value,
    std::{collections::VecDeque, sync::Mutex},
    tokio::sync::oneshot,
};

use crate::{Error, GatewayChannel, Result};

/// Replies to calls from a queue and records every request it sees.
#[derive(Default)]
pub struct ScriptedChannel {
    replies: Mutex<VecDeque<Result<Value>>>,
    calls: Mutex<Vec<(String, Value)>>,
    disconnected: bool,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disconnected() -> Self {
        Self {
            disconnected: true,
            ..Self::default()
        }
    }

    pub fn reply(self, payload: Value) -> Self {
        self.replies.lock().unwrap().push_back(Ok(payload));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::transport(message)));
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(m, _)| m).collect()
    }
}

#[async_trait]
impl GatewayChannel for ScriptedChannel {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.calls.lock().unwrap().push((method.to_string(), params));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::transport(format!("no scripted reply for {method}"))))
    }

    fn is_connected(&self) -> bool {
        !self.disconnected
    }
}

/// Holds its single reply until the test releases it.
pub struct GatedChannel {
    reply: tokio::sync::Mutex<Option<oneshot::Receiver<Result<Value>>>>,
}

impl GatedChannel {
    pub fn new() -> (Self, oneshot::Sender<Result<Value>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                reply: tokio::sync::Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl GatewayChannel for GatedChannel {
    async fn request(&self, method: &str, _params: Value) -> Result<Value> {
        let rx = self.reply.lock().await.take();
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(Error::transport("gate dropped"))),
            None => Err(Error::transport(format!("{method} already answered"))),
        }
    }
}
