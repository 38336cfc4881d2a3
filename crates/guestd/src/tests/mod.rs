//! Test suites for the guest agent.

mod behaviour;
pub(crate) mod support;
