//! Step vocabulary and payloads of the `wizard.*` RPC methods.
//!
//! The gateway owns step sequencing; clients only render the [`Step`] they are
//! handed and answer it by id. Kinds and executors the client does not know
//! are preserved verbatim so newer gateways keep working with older clients.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

// ── Step kinds ───────────────────────────────────────────────────────────────

/// What kind of interaction a step asks for. Wire name: `type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepKind {
    Note,
    Select,
    Text,
    Confirm,
    Multiselect,
    Progress,
    Action,
    /// A kind this client does not recognize, kept as sent.
    Unknown(String),
}

impl StepKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Note => "note",
            Self::Select => "select",
            Self::Text => "text",
            Self::Confirm => "confirm",
            Self::Multiselect => "multiselect",
            Self::Progress => "progress",
            Self::Action => "action",
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether this kind carries an `options` list.
    pub fn has_options(&self) -> bool {
        matches!(self, Self::Select | Self::Multiselect)
    }
}

impl From<String> for StepKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "note" => Self::Note,
            "select" => Self::Select,
            "text" => Self::Text,
            "confirm" => Self::Confirm,
            "multiselect" => Self::Multiselect,
            "progress" => Self::Progress,
            "action" => Self::Action,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<StepKind> for String {
    fn from(kind: StepKind) -> Self {
        match kind {
            StepKind::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Executor ─────────────────────────────────────────────────────────────────

/// Which side performs an `action` step's side effect.
///
/// The session driver never branches on this; it is carried for renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepExecutor {
    Gateway,
    Client,
    Other(String),
}

impl From<String> for StepExecutor {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "gateway" => Self::Gateway,
            "client" => Self::Client,
            _ => Self::Other(raw),
        }
    }
}

impl From<StepExecutor> for String {
    fn from(executor: StepExecutor) -> Self {
        match executor {
            StepExecutor::Gateway => "gateway".into(),
            StepExecutor::Client => "client".into(),
            StepExecutor::Other(raw) => raw,
        }
    }
}

// ── Step ─────────────────────────────────────────────────────────────────────

/// One choice of a `select` or `multiselect` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOption {
    pub value: Value,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// One unit of interaction the gateway wants presented.
///
/// `message` may contain markdown and terminal escapes; renderers must clean
/// and sanitize it before display.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Display order; never re-sorted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<StepOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<StepExecutor>,
}

impl Step {
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            kind,
            title: None,
            message: None,
            options: Vec::new(),
            initial_value: None,
            placeholder: None,
            sensitive: false,
            executor: None,
        }
    }

    /// Options of a `select`/`multiselect` step; empty for every other kind.
    pub fn options(&self) -> &[StepOption] {
        if self.kind.has_options() {
            &self.options
        } else {
            &[]
        }
    }

    /// The pre-fill for a `text` step rendered as the input's starting text.
    pub fn initial_text(&self) -> String {
        match &self.initial_value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let initial_value: &dyn std::fmt::Debug = match (&self.initial_value, self.sensitive) {
            (Some(_), true) => &"[REDACTED]",
            (value, _) => value,
        };
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("message", &self.message)
            .field("options", &self.options)
            .field("initial_value", initial_value)
            .field("placeholder", &self.placeholder)
            .field("sensitive", &self.sensitive)
            .field("executor", &self.executor)
            .finish()
    }
}

// ── Session status and results ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStatus {
    Running,
    Done,
    Cancelled,
    Error,
}

impl WizardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for WizardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `wizard.next`, and the common part of `wizard.start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardNextResult {
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    pub status: WizardStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of `wizard.start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardStartResult {
    pub session_id: String,
    #[serde(flatten)]
    pub outcome: WizardNextResult,
}

// ── Request params ───────────────────────────────────────────────────────────

/// The answer to one step. `value` is omitted for acknowledgements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardAnswer {
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardNextParams {
    pub session_id: String,
    pub answer: WizardAnswer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardCancelParams {
    pub session_id: String,
}
