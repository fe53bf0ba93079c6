//! Client side of the gateway setup wizard.
//!
//! The gateway owns the wizard's steps and their order. This crate drives a
//! session (`start` → `advance`… → done, or `cancel`), keeps the state a
//! renderer reads, and maps user actions on a step to answers.

pub mod adapter;
pub mod channel;
pub mod driver;
pub mod error;
pub mod message;
pub mod state;
pub mod view;

#[cfg(test)]
mod testing;

pub use {
    adapter::{Answer, Interaction, Refusal, StepAction, StepInteraction},
    channel::GatewayChannel,
    driver::{NOT_CONNECTED, WizardDriver},
    error::{Error, Result},
    state::SessionState,
    view::{Controls, Screen, StepView, screen},
};
