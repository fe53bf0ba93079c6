//! What a renderer should show for a given [`SessionState`].
//!
//! Pure decisions only; drawing is left to the renderer.

use {
    serde_json::Value,
    wizard_protocol::{Step, StepExecutor, StepKind},
};

use crate::{SessionState, message::clean_terminal_markup};

/// The top-level screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    /// The gateway reported the run as done.
    Complete,
    Connecting,
    /// No session yet; offer to start one.
    Welcome { error: Option<String>, can_start: bool },
    Active(ActiveView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveView {
    pub error: Option<String>,
    /// A call is in flight and there is no step to show meanwhile.
    pub loading: bool,
    pub step: Option<StepView>,
    /// Inputs and the "start over" action are disabled while busy.
    pub inputs_enabled: bool,
}

pub fn screen(state: &SessionState, connected: bool, selected: &[Value]) -> Screen {
    if state.completed {
        return Screen::Complete;
    }
    if !connected {
        return Screen::Connecting;
    }
    if !state.has_session() && !state.busy {
        return Screen::Welcome {
            error: state.error.clone(),
            can_start: true,
        };
    }
    Screen::Active(ActiveView {
        error: state.error.clone(),
        loading: state.busy && state.current_step.is_none(),
        step: state
            .current_step
            .as_ref()
            .map(|step| StepView::new(step, selected)),
        inputs_enabled: !state.busy,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepView {
    pub id: String,
    pub title: Option<String>,
    /// Markdown with terminal escapes removed; still needs sanitizing.
    pub message: Option<String>,
    pub executor: Option<StepExecutor>,
    pub controls: Controls,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Controls {
    /// A single "Continue" button.
    Continue,
    Choices(Vec<ChoiceView>),
    TextInput {
        masked: bool,
        placeholder: String,
        initial: String,
    },
    YesNo,
    /// Checkboxes plus a "Continue" button.
    Checklist(Vec<ChoiceView>),
    Spinner,
    Unsupported { label: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceView {
    pub label: String,
    pub hint: Option<String>,
    pub checked: bool,
}

impl StepView {
    /// `selected` holds the multiselect values currently toggled on.
    pub fn new(step: &Step, selected: &[Value]) -> Self {
        let choices = || -> Vec<ChoiceView> {
            step.options()
                .iter()
                .map(|option| ChoiceView {
                    label: option.label.clone(),
                    hint: option.hint.clone(),
                    checked: selected.contains(&option.value),
                })
                .collect()
        };
        let controls = match &step.kind {
            StepKind::Note | StepKind::Action => Controls::Continue,
            StepKind::Select => Controls::Choices(choices()),
            StepKind::Text => Controls::TextInput {
                masked: step.sensitive,
                placeholder: step.placeholder.clone().unwrap_or_default(),
                initial: step.initial_text(),
            },
            StepKind::Confirm => Controls::YesNo,
            StepKind::Multiselect => Controls::Checklist(choices()),
            StepKind::Progress => Controls::Spinner,
            StepKind::Unknown(kind) => Controls::Unsupported {
                label: format!("Unknown step type: {kind}"),
            },
        };
        Self {
            id: step.id.clone(),
            title: step.title.clone(),
            message: step
                .message
                .as_deref()
                .filter(|m| !m.is_empty())
                .map(clean_terminal_markup),
            executor: step.executor.clone(),
            controls,
        }
    }
}
