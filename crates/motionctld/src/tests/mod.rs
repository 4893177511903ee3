//! Test suites for the motion supervisor.

mod behaviour;
pub(crate) mod support;
