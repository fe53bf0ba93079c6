use wizard_protocol::{Step, WizardStatus};

/// Where one wizard run currently stands.
///
/// Written only by [`crate::WizardDriver`]; renderers read it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Set by a successful start, cleared only by cancel.
    pub session_id: Option<String>,
    pub current_step: Option<Step>,
    /// `None` until the first result arrives.
    pub status: Option<WizardStatus>,
    pub error: Option<String>,
    /// True exactly while a start/advance call is in flight.
    pub busy: bool,
    pub completed: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_session(&self) -> bool {
        self.session_id.is_some()
    }
}
