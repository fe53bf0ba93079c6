//! Drives one wizard run against the gateway: `wizard.start`,
//! `wizard.next`, `wizard.cancel`.
//!
//! Every failure ends here. Callers observe outcomes only through
//! [`SessionState`], published on a `watch` channel so a renderer can read the
//! state (including `busy`) while a call is suspended on the network.

use {
    serde::de::DeserializeOwned,
    serde_json::{Value, json},
    std::sync::Arc,
    tokio::sync::watch,
    tracing::{debug, info, warn},
    wizard_common::describe_error,
    wizard_protocol::{
        Step, WizardAnswer, WizardCancelParams, WizardNextParams, WizardNextResult,
        WizardStartResult, WizardStatus, methods,
    },
};

use crate::{Error, GatewayChannel, Result, SessionState};

/// Recorded in `error` when start is attempted with no channel.
pub const NOT_CONNECTED: &str = "Not connected to gateway";

pub struct WizardDriver {
    channel: Option<Arc<dyn GatewayChannel>>,
    state: watch::Sender<SessionState>,
}

impl WizardDriver {
    pub fn new(channel: Option<Arc<dyn GatewayChannel>>) -> Self {
        let (state, _) = watch::channel(SessionState::new());
        Self { channel, state }
    }

    /// Swap the channel, e.g. after a reconnect. Session state is kept.
    pub fn set_channel(&mut self, channel: Option<Arc<dyn GatewayChannel>>) {
        self.channel = channel;
    }

    pub fn is_connected(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_connected())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy
    }

    pub fn current_step(&self) -> Option<Step> {
        self.state.borrow().current_step.clone()
    }

    /// Open a new session and load its first step.
    ///
    /// A missing channel and a channel reporting `is_connected() == false` are
    /// treated alike: [`NOT_CONNECTED`] is recorded and nothing is sent.
    pub async fn start(&self) {
        let Some(channel) = self.channel.as_deref().filter(|c| c.is_connected()) else {
            warn!("wizard start requested without a connected gateway channel");
            self.state
                .send_modify(|s| s.error = Some(NOT_CONNECTED.to_string()));
            return;
        };

        let _busy = InFlight::begin(&self.state);
        match call::<WizardStartResult>(channel, methods::WIZARD_START, json!({})).await {
            Ok(result) => {
                info!(
                    session_id = %result.session_id,
                    status = %result.outcome.status,
                    step_id = result.outcome.step.as_ref().map(|s| s.id.as_str()),
                    "wizard session started"
                );
                self.state.send_modify(|s| {
                    s.session_id = Some(result.session_id);
                    apply_outcome(s, result.outcome);
                });
            },
            Err(error) => self.record_failure(methods::WIZARD_START, &error),
        }
    }

    /// Answer `step_id` and move to whatever the gateway returns next.
    ///
    /// `value` is `None` for acknowledgements. Without a channel or an open
    /// session this does nothing. A disconnected channel is still called; its
    /// failure is recorded like any other.
    pub async fn advance(&self, step_id: &str, value: Option<Value>) {
        let (Some(channel), Some(session_id)) = (self.channel.as_deref(), self.session_id())
        else {
            debug!(step_id, "wizard advance ignored, no active session");
            return;
        };

        let _busy = InFlight::begin(&self.state);
        let params = WizardNextParams {
            session_id,
            answer: WizardAnswer {
                step_id: step_id.to_string(),
                value,
            },
        };
        let result = match serde_json::to_value(&params) {
            Ok(params) => call::<WizardNextResult>(channel, methods::WIZARD_NEXT, params).await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(outcome) => {
                debug!(
                    step_id,
                    status = %outcome.status,
                    done = outcome.done,
                    next_step_id = outcome.step.as_ref().map(|s| s.id.as_str()),
                    "wizard advanced"
                );
                self.state.send_modify(|s| apply_outcome(s, outcome));
            },
            Err(error) => self.record_failure(methods::WIZARD_NEXT, &error),
        }
    }

    /// Close the session. Local state is reset whatever the gateway says.
    pub async fn cancel(&self) {
        let (Some(channel), Some(session_id)) = (self.channel.as_deref(), self.session_id())
        else {
            return;
        };

        let _reset = ResetOnDrop(&self.state);
        let params = WizardCancelParams {
            session_id: session_id.clone(),
        };
        let result = match serde_json::to_value(&params) {
            Ok(params) => channel.request(methods::WIZARD_CANCEL, params).await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(_) => info!(session_id = %session_id, "wizard session cancelled"),
            // The gateway may already have dropped the session.
            Err(error) => debug!(session_id = %session_id, error = %error, "wizard cancel failed"),
        }
    }

    fn session_id(&self) -> Option<String> {
        self.state.borrow().session_id.clone()
    }

    fn record_failure(&self, method: &str, error: &Error) {
        warn!(method, error = %error, "wizard call failed");
        let message = describe_error(error);
        self.state.send_modify(|s| s.error = Some(message));
    }
}

async fn call<T: DeserializeOwned>(
    channel: &dyn GatewayChannel,
    method: &'static str,
    params: Value,
) -> Result<T> {
    let payload = channel.request(method, params).await?;
    serde_json::from_value(payload).map_err(|source| Error::Decode { method, source })
}

fn apply_outcome(state: &mut SessionState, outcome: WizardNextResult) {
    state.current_step = match outcome.status {
        WizardStatus::Cancelled => None,
        _ => outcome.step,
    };
    state.status = Some(outcome.status);
    state.completed = outcome.done;
    if let Some(error) = outcome.error {
        state.error = Some(error);
    }
}

/// Marks the state busy for its lifetime. Dropping it (normal return, early
/// return, or the call future being dropped) clears `busy`.
struct InFlight<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl<'a> InFlight<'a> {
    fn begin(state: &'a watch::Sender<SessionState>) -> Self {
        state.send_modify(|s| {
            s.busy = true;
            s.error = None;
        });
        Self { state }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.busy = false);
    }
}

struct ResetOnDrop<'a>(&'a watch::Sender<SessionState>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|s| {
            s.session_id = None;
            s.current_step = None;
            s.status = None;
            s.completed = false;
        });
    }
}
