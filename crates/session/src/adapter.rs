//! Turns a user's action on the rendered step into exactly one answer.
//!
//! Answers are typed here ([`Answer`]) and only become an opaque JSON value
//! when handed to [`WizardDriver::advance`].

use {
    secrecy::{ExposeSecret, SecretString},
    serde_json::Value,
    tracing::debug,
    wizard_protocol::{Step, StepKind},
};

use crate::WizardDriver;

/// Something the user did on the current step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// "Continue" on a note or action step.
    Acknowledge,
    /// Pick the option at this display index of a select step.
    Select(usize),
    SubmitText(String),
    Confirm(bool),
    /// Flip the option at this display index of a multiselect step.
    Toggle(usize),
    /// Submit the current multiselect selection.
    Continue,
}

/// A step answer, shaped by the step's kind.
#[derive(Debug)]
pub enum Answer {
    Acknowledge,
    Choice(Value),
    Text(String),
    /// Text typed into a `sensitive` step.
    Secret(SecretString),
    Confirm(bool),
    /// Selected values in the order they were picked.
    Selection(Vec<Value>),
}

impl Answer {
    /// The wire value for `wizard.next`; `None` for acknowledgements.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Acknowledge => None,
            Self::Choice(value) => Some(value.clone()),
            Self::Text(text) => Some(Value::String(text.clone())),
            Self::Secret(secret) => Some(Value::String(secret.expose_secret().clone())),
            Self::Confirm(yes) => Some(Value::Bool(*yes)),
            Self::Selection(values) => Some(Value::Array(values.clone())),
        }
    }
}

/// Why an action produced no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// A call is already in flight.
    Busy,
    NoStep,
    /// Progress steps and unknown kinds take no input.
    NotInteractive,
    /// The action does not apply to this step's kind.
    WrongAction,
    EmptyInput,
    NoSuchOption,
}

#[derive(Debug)]
pub enum Interaction {
    Answer(Answer),
    /// A multiselect option was flipped; `selected` is the new count.
    Toggled { selected: usize },
    Refused(Refusal),
}

#[derive(Debug)]
struct Selection {
    step_id: String,
    values: Vec<Value>,
}

/// Per-session interaction state: the pending multiselect selection.
///
/// The selection belongs to one step id and is dropped as soon as a different
/// step becomes current.
#[derive(Debug, Default)]
pub struct StepInteraction {
    selection: Option<Selection>,
}

impl StepInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop selection state that belongs to a step other than `current`.
    pub fn sync(&mut self, current: Option<&Step>) {
        let stale = match (&self.selection, current) {
            (Some(sel), Some(step)) => sel.step_id != step.id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if stale {
            self.selection = None;
        }
    }

    /// Values currently toggled on for `step_id`, in selection order.
    pub fn selected(&self, step_id: &str) -> &[Value] {
        match &self.selection {
            Some(sel) if sel.step_id == step_id => &sel.values,
            _ => &[],
        }
    }

    /// Decide what `action` means on `step`. Pure apart from multiselect
    /// bookkeeping; nothing is sent.
    pub fn interpret(&mut self, step: &Step, action: StepAction, busy: bool) -> Interaction {
        if busy {
            return Interaction::Refused(Refusal::Busy);
        }
        self.sync(Some(step));

        let answer = match (&step.kind, action) {
            (StepKind::Note | StepKind::Action, StepAction::Acknowledge) => Answer::Acknowledge,
            (StepKind::Select, StepAction::Select(index)) => match step.options().get(index) {
                Some(option) => Answer::Choice(option.value.clone()),
                None => return Interaction::Refused(Refusal::NoSuchOption),
            },
            (StepKind::Text, StepAction::SubmitText(input)) => {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    return Interaction::Refused(Refusal::EmptyInput);
                }
                if step.sensitive {
                    Answer::Secret(SecretString::new(trimmed.to_string()))
                } else {
                    Answer::Text(trimmed.to_string())
                }
            },
            (StepKind::Confirm, StepAction::Confirm(yes)) => Answer::Confirm(yes),
            (StepKind::Multiselect, StepAction::Toggle(index)) => {
                let Some(option) = step.options().get(index) else {
                    return Interaction::Refused(Refusal::NoSuchOption);
                };
                let selected = self.toggle(&step.id, &option.value);
                return Interaction::Toggled { selected };
            },
            (StepKind::Multiselect, StepAction::Continue) => {
                Answer::Selection(self.selected(&step.id).to_vec())
            },
            (StepKind::Progress | StepKind::Unknown(_), _) => {
                return Interaction::Refused(Refusal::NotInteractive);
            },
            _ => return Interaction::Refused(Refusal::WrongAction),
        };
        Interaction::Answer(answer)
    }

    /// Interpret `action` against the driver's current step and, when it
    /// yields an answer, advance the session with it.
    pub async fn dispatch(&mut self, driver: &WizardDriver, action: StepAction) -> Interaction {
        let (step, busy) = {
            let state = driver.snapshot();
            (state.current_step, state.busy)
        };
        self.sync(step.as_ref());
        let Some(step) = step else {
            return Interaction::Refused(Refusal::NoStep);
        };

        let interaction = self.interpret(&step, action, busy);
        if let Interaction::Answer(answer) = &interaction {
            debug!(step_id = %step.id, kind = %step.kind, "answering wizard step");
            driver.advance(&step.id, answer.to_value()).await;
            self.sync(driver.current_step().as_ref());
        }
        interaction
    }

    fn toggle(&mut self, step_id: &str, value: &Value) -> usize {
        let selection = self.selection.get_or_insert_with(|| Selection {
            step_id: step_id.to_string(),
            values: Vec::new(),
        });
        match selection.values.iter().position(|v| v == value) {
            Some(pos) => {
                selection.values.remove(pos);
            },
            None => selection.values.push(value.clone()),
        }
        selection.values.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{GatewayChannel, testing::ScriptedChannel},
        rstest::rstest,
        serde_json::json,
        std::sync::Arc,
        wizard_protocol::StepOption,
    };

    fn step(id: &str, kind: StepKind) -> Step {
        let mut step = Step::new(id, kind);
        if step.kind.has_options() {
            step.options = ["a", "b", "c"]
                .iter()
                .map(|v| StepOption {
                    value: json!(v),
                    label: v.to_uppercase(),
                    hint: None,
                })
                .collect();
        }
        step
    }

    fn answer_value(interaction: Interaction) -> Option<Value> {
        match interaction {
            Interaction::Answer(answer) => answer.to_value(),
            other => panic!("expected an answer, got {other:?}"),
        }
    }

    #[rstest]
    #[case(StepKind::Note)]
    #[case(StepKind::Action)]
    fn acknowledge_has_no_value(#[case] kind: StepKind) {
        let mut ix = StepInteraction::new();
        let out = ix.interpret(&step("s", kind), StepAction::Acknowledge, false);
        assert_eq!(answer_value(out), None);
    }

    #[test]
    fn select_answers_with_option_value() {
        let mut ix = StepInteraction::new();
        let out = ix.interpret(&step("s", StepKind::Select), StepAction::Select(1), false);
        assert_eq!(answer_value(out), Some(json!("b")));
    }

    #[test]
    fn select_out_of_range_is_refused() {
        let mut ix = StepInteraction::new();
        let out = ix.interpret(&step("s", StepKind::Select), StepAction::Select(9), false);
        assert!(matches!(out, Interaction::Refused(Refusal::NoSuchOption)));
    }

    #[rstest]
    #[case("  Alice  ", Some(json!("Alice")))]
    #[case("", None)]
    #[case(" \t\n", None)]
    fn text_is_trimmed_and_blank_refused(#[case] input: &str, #[case] expected: Option<Value>) {
        let mut ix = StepInteraction::new();
        let out = ix.interpret(
            &step("s", StepKind::Text),
            StepAction::SubmitText(input.into()),
            false,
        );
        match expected {
            Some(value) => assert_eq!(answer_value(out), Some(value)),
            None => assert!(matches!(out, Interaction::Refused(Refusal::EmptyInput))),
        }
    }

    #[test]
    fn sensitive_text_is_kept_secret() {
        let mut ix = StepInteraction::new();
        let mut secret_step = step("key", StepKind::Text);
        secret_step.sensitive = true;
        let out = ix.interpret(&secret_step, StepAction::SubmitText(" sk-123 ".into()), false);
        let Interaction::Answer(answer) = out else {
            panic!("expected answer");
        };
        assert!(matches!(answer, Answer::Secret(_)));
        assert!(!format!("{answer:?}").contains("sk-123"));
        assert_eq!(answer.to_value(), Some(json!("sk-123")));
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn confirm_answers_literal_bool(#[case] yes: bool) {
        let mut ix = StepInteraction::new();
        let out = ix.interpret(&step("s", StepKind::Confirm), StepAction::Confirm(yes), false);
        assert_eq!(answer_value(out), Some(json!(yes)));
    }

    #[test]
    fn multiselect_keeps_selection_order() {
        let mut ix = StepInteraction::new();
        let ms = step("channels", StepKind::Multiselect);
        ix.interpret(&ms, StepAction::Toggle(2), false);
        ix.interpret(&ms, StepAction::Toggle(0), false);
        ix.interpret(&ms, StepAction::Toggle(1), false);
        let out = ix.interpret(&ms, StepAction::Toggle(0), false);
        assert!(matches!(out, Interaction::Toggled { selected: 2 }));

        let out = ix.interpret(&ms, StepAction::Continue, false);
        assert_eq!(answer_value(out), Some(json!(["c", "b"])));
    }

    #[test]
    fn multiselect_continue_with_nothing_selected() {
        let mut ix = StepInteraction::new();
        let out = ix.interpret(&step("ms", StepKind::Multiselect), StepAction::Continue, false);
        assert_eq!(answer_value(out), Some(json!([])));
    }

    #[test]
    fn selection_resets_when_step_changes() {
        let mut ix = StepInteraction::new();
        let first = step("first", StepKind::Multiselect);
        ix.interpret(&first, StepAction::Toggle(0), false);
        assert_eq!(ix.selected("first"), &[json!("a")]);

        let second = step("second", StepKind::Multiselect);
        ix.sync(Some(&second));
        assert!(ix.selected("first").is_empty());

        let out = ix.interpret(&second, StepAction::Continue, false);
        assert_eq!(answer_value(out), Some(json!([])));
    }

    #[rstest]
    #[case(StepKind::Progress, StepAction::Acknowledge)]
    #[case(StepKind::Progress, StepAction::Continue)]
    #[case(StepKind::Unknown("mystery".into()), StepAction::Acknowledge)]
    fn non_interactive_steps_never_answer(#[case] kind: StepKind, #[case] action: StepAction) {
        let mut ix = StepInteraction::new();
        let out = ix.interpret(&step("s", kind), action, false);
        assert!(matches!(out, Interaction::Refused(Refusal::NotInteractive)));
    }

    #[test]
    fn mismatched_action_is_refused() {
        let mut ix = StepInteraction::new();
        let out = ix.interpret(&step("s", StepKind::Confirm), StepAction::Select(0), false);
        assert!(matches!(out, Interaction::Refused(Refusal::WrongAction)));
    }

    #[test]
    fn busy_refuses_everything() {
        let mut ix = StepInteraction::new();
        let ms = step("ms", StepKind::Multiselect);
        let out = ix.interpret(&ms, StepAction::Toggle(0), true);
        assert!(matches!(out, Interaction::Refused(Refusal::Busy)));
        assert!(ix.selected("ms").is_empty());
    }

    #[tokio::test]
    async fn dispatch_without_step_is_refused() {
        let channel = Arc::new(ScriptedChannel::new());
        let driver = WizardDriver::new(Some(channel.clone() as Arc<dyn GatewayChannel>));
        let mut ix = StepInteraction::new();
        let out = ix.dispatch(&driver, StepAction::Acknowledge).await;
        assert!(matches!(out, Interaction::Refused(Refusal::NoStep)));
        assert!(channel.calls().is_empty());
    }

    #[tokio::test]
    async fn dispatch_sends_one_advance_per_answer() {
        let channel = Arc::new(
            ScriptedChannel::new()
                .reply(json!({
                    "sessionId": "s1",
                    "done": false,
                    "status": "running",
                    "step": {
                        "id": "channels",
                        "type": "multiselect",
                        "options": [
                            { "value": "telegram", "label": "Telegram" },
                            { "value": "slack", "label": "Slack" },
                        ],
                    },
                }))
                .reply(json!({ "done": true, "status": "done" })),
        );
        let driver = WizardDriver::new(Some(channel.clone() as Arc<dyn GatewayChannel>));
        driver.start().await;

        let mut ix = StepInteraction::new();
        ix.dispatch(&driver, StepAction::Toggle(1)).await;
        ix.dispatch(&driver, StepAction::Toggle(0)).await;
        assert_eq!(channel.calls().len(), 1);

        ix.dispatch(&driver, StepAction::Continue).await;
        let calls = channel.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].1["answer"],
            json!({ "stepId": "channels", "value": ["slack", "telegram"] })
        );
        assert!(driver.snapshot().completed);
        assert!(ix.selected("channels").is_empty());
    }
}
