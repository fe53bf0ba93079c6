//! Line-based rendering of the wizard.
//!
//! Each turn prints the current screen, reads one line, and turns it into a
//! [`StepAction`] for the step on screen. `cancel` starts over and `quit`
//! leaves from any prompt.

use std::io::Write;

use {
    anyhow::bail,
    tokio::{
        io::{AsyncBufReadExt, BufReader},
        sync::mpsc,
    },
    tracing::{debug, warn},
    wizard_client::GatewayEvent,
    wizard_protocol::StepExecutor,
    wizard_session::{
        Controls, Interaction, Refusal, Screen, StepAction, StepInteraction, StepView,
        WizardDriver, screen, view::ChoiceView,
    },
};

/// What one typed line means.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Action(StepAction),
    /// Cancel the session and go back to the welcome prompt.
    StartOver,
    Quit,
    Invalid(&'static str),
}

/// Parse `line` against the controls currently on screen. `None` means no
/// step is shown, so only `cancel` and `quit` apply.
pub fn parse_line(controls: Option<&Controls>, line: &str) -> Command {
    let input = line.trim();
    match input.to_ascii_lowercase().as_str() {
        "quit" | "q" => return Command::Quit,
        "cancel" => return Command::StartOver,
        _ => {},
    }
    let Some(controls) = controls else {
        return Command::Invalid("type `cancel` to start over or `quit` to leave");
    };

    match controls {
        Controls::Continue if input.is_empty() => Command::Action(StepAction::Acknowledge),
        Controls::Continue => Command::Invalid("press Enter to continue"),
        Controls::Choices(_) => match parse_index(input) {
            Some(index) => Command::Action(StepAction::Select(index)),
            None => Command::Invalid("enter the number of an option"),
        },
        Controls::TextInput { initial, .. } => {
            let text = if input.is_empty() { initial.as_str() } else { line };
            Command::Action(StepAction::SubmitText(text.to_string()))
        },
        Controls::YesNo => match input.to_ascii_lowercase().as_str() {
            "y" | "yes" => Command::Action(StepAction::Confirm(true)),
            "n" | "no" => Command::Action(StepAction::Confirm(false)),
            _ => Command::Invalid("answer y or n"),
        },
        Controls::Checklist(_) => {
            if input.is_empty() || input.eq_ignore_ascii_case("done") {
                return Command::Action(StepAction::Continue);
            }
            match parse_index(input) {
                Some(index) => Command::Action(StepAction::Toggle(index)),
                None => Command::Invalid("enter an option number to toggle, or `done`"),
            }
        },
        Controls::Spinner | Controls::Unsupported { .. } => {
            Command::Invalid("this step takes no input; type `cancel` or `quit`")
        },
    }
}

/// One-based option number to a display index.
fn parse_index(input: &str) -> Option<usize> {
    input.parse::<usize>().ok()?.checked_sub(1)
}

pub fn describe_refusal(refusal: Refusal) -> &'static str {
    match refusal {
        Refusal::Busy => "still waiting for the gateway",
        Refusal::NoStep => "there is no step to answer",
        Refusal::NotInteractive => "this step takes no input",
        Refusal::WrongAction => "that does not answer this step",
        Refusal::EmptyInput => "a value is required",
        Refusal::NoSuchOption => "no option with that number",
    }
}

/// Drive the wizard until it completes, the user quits, or stdin closes.
pub async fn run(
    driver: WizardDriver,
    mut events: mpsc::UnboundedReceiver<GatewayEvent>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interaction = StepInteraction::new();

    'screen: loop {
        let state = driver.snapshot();
        interaction.sync(state.current_step.as_ref());
        let selected = state
            .current_step
            .as_ref()
            .map(|step| interaction.selected(&step.id).to_vec())
            .unwrap_or_default();

        let view = screen(&state, driver.is_connected(), &selected);
        let controls = match &view {
            Screen::Complete => {
                println!("\nSetup complete.");
                return Ok(());
            },
            Screen::Connecting => {
                println!("Connecting to gateway...");
                match events.recv().await {
                    Some(event) => report_event(event),
                    None => bail!("gateway connection task stopped"),
                }
                continue;
            },
            Screen::Welcome { error, .. } => {
                if let Some(error) = error {
                    println!("error: {error}");
                }
                prompt("Press Enter to start setup (`quit` to leave)")?;
                None
            },
            Screen::Active(active) => {
                if let Some(error) = &active.error {
                    println!("error: {error}");
                }
                if active.loading {
                    println!("Loading...");
                }
                match &active.step {
                    Some(step) => {
                        render_step(&mut std::io::stdout(), step)?;
                        prompt(hint_for(&step.controls))?;
                    },
                    None => prompt("`cancel` to start over, `quit` to leave")?,
                }
                active.step.as_ref().map(|step| step.controls.clone())
            },
        };

        let line = loop {
            tokio::select! {
                line = lines.next_line() => break line?,
                event = events.recv() => match event {
                    Some(GatewayEvent::Event(frame)) => {
                        debug!(event = %frame.event, "gateway event");
                    },
                    Some(event) => {
                        report_event(event);
                        continue 'screen;
                    },
                    None => bail!("gateway connection task stopped"),
                },
            }
        };
        let Some(line) = line else {
            debug!("stdin closed");
            driver.cancel().await;
            return Ok(());
        };

        if matches!(view, Screen::Welcome { .. }) {
            match parse_line(None, &line) {
                Command::Quit => return Ok(()),
                _ => driver.start().await,
            }
            continue;
        }

        match parse_line(controls.as_ref(), &line) {
            Command::Quit => {
                driver.cancel().await;
                return Ok(());
            },
            Command::StartOver => driver.cancel().await,
            Command::Invalid(message) => println!("{message}"),
            Command::Action(action) => match interaction.dispatch(&driver, action).await {
                Interaction::Refused(refusal) => println!("{}", describe_refusal(refusal)),
                Interaction::Toggled { selected } => println!("{selected} selected"),
                Interaction::Answer(_) => {},
            },
        }
    }
}

fn report_event(event: GatewayEvent) {
    match event {
        GatewayEvent::Connected(_) => debug!("gateway connected"),
        GatewayEvent::Disconnected => println!("Disconnected from gateway."),
        GatewayEvent::Error(message) => warn!(error = %message, "gateway connection error"),
        GatewayEvent::Event(frame) => debug!(event = %frame.event, "gateway event"),
    }
}

fn render_step(out: &mut impl Write, step: &StepView) -> std::io::Result<()> {
    writeln!(out)?;
    if let Some(title) = &step.title {
        writeln!(out, "== {title} ==")?;
    }
    if let Some(message) = &step.message {
        writeln!(out, "{message}")?;
    }
    if step.executor == Some(StepExecutor::Client) {
        writeln!(out, "(runs on this machine)")?;
    }
    match &step.controls {
        Controls::Choices(choices) | Controls::Checklist(choices) => {
            let checklist = matches!(step.controls, Controls::Checklist(_));
            for (index, choice) in choices.iter().enumerate() {
                writeln!(out, "{}", format_choice(index, choice, checklist))?;
            }
        },
        Controls::TextInput {
            masked: true,
            initial,
            ..
        } => {
            if !initial.is_empty() {
                writeln!(out, "(Enter keeps the current value)")?;
            }
            writeln!(out, "(input is visible as you type)")?;
        },
        Controls::TextInput {
            placeholder,
            initial,
            ..
        } => {
            if !initial.is_empty() {
                writeln!(out, "(default: {initial})")?;
            } else if !placeholder.is_empty() {
                writeln!(out, "(e.g. {placeholder})")?;
            }
        },
        Controls::Spinner => writeln!(out, "Working...")?,
        Controls::Unsupported { label } => writeln!(out, "{label}")?,
        Controls::Continue | Controls::YesNo => {},
    }
    Ok(())
}

fn format_choice(index: usize, choice: &ChoiceView, checklist: bool) -> String {
    let mark = match (checklist, choice.checked) {
        (false, _) => "",
        (true, true) => "[x] ",
        (true, false) => "[ ] ",
    };
    match &choice.hint {
        Some(hint) => format!("  {}. {mark}{} ({hint})", index + 1, choice.label),
        None => format!("  {}. {mark}{}", index + 1, choice.label),
    }
}

fn hint_for(controls: &Controls) -> &'static str {
    match controls {
        Controls::Continue => "Press Enter to continue",
        Controls::Choices(_) => "Option number",
        Controls::TextInput { masked: true, .. } => "Secret value",
        Controls::TextInput { .. } => "Value",
        Controls::YesNo => "y/n",
        Controls::Checklist(_) => "Number to toggle, Enter or `done` to continue",
        Controls::Spinner | Controls::Unsupported { .. } => "`cancel` or `quit`",
    }
}

fn prompt(hint: &str) -> std::io::Result<()> {
    let mut out = std::io::stdout();
    write!(out, "{hint}> ")?;
    out.flush()
}
