//! Misbehaving status calculators for fault-isolation tests.

use std::sync::{Arc, Mutex};

use anyhow::bail;
use runboard::status::{DetailedStatus, DetailedStatusCalculator};
use runboard::types::CommandStatus;

/// Panics on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingCalculator;

impl DetailedStatusCalculator for PanickingCalculator {
    fn reset(&mut self) {}

    fn add_out(&mut self, _chunk: &str) -> anyhow::Result<()> {
        panic!("calculator blew up on output");
    }

    fn set_status(&mut self, _status: CommandStatus) -> anyhow::Result<()> {
        panic!("calculator blew up on status");
    }

    fn detailed_status(&self) -> Option<DetailedStatus> {
        None
    }

    fn boxed_clone(&self) -> Box<dyn DetailedStatusCalculator> {
        Box::new(*self)
    }
}

/// Returns an error from every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCalculator;

impl DetailedStatusCalculator for FailingCalculator {
    fn reset(&mut self) {}

    fn add_out(&mut self, _chunk: &str) -> anyhow::Result<()> {
        bail!("unparseable output")
    }

    fn set_status(&mut self, _status: CommandStatus) -> anyhow::Result<()> {
        bail!("unexpected status")
    }

    fn detailed_status(&self) -> Option<DetailedStatus> {
        None
    }

    fn boxed_clone(&self) -> Box<dyn DetailedStatusCalculator> {
        Box::new(*self)
    }
}

/// What a [`RecordingCalculator`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalculatorCall {
    Reset,
    AddOut(String),
    SetStatus(CommandStatus),
}

/// Records every call into a log shared with the test, including calls on
/// its clones.
#[derive(Debug, Clone, Default)]
pub struct RecordingCalculator {
    calls: Arc<Mutex<Vec<CalculatorCall>>>,
}

impl RecordingCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CalculatorCall> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn push(&self, call: CalculatorCall) {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(call);
    }
}

impl DetailedStatusCalculator for RecordingCalculator {
    fn reset(&mut self) {
        self.push(CalculatorCall::Reset);
    }

    fn add_out(&mut self, chunk: &str) -> anyhow::Result<()> {
        self.push(CalculatorCall::AddOut(chunk.to_string()));
        Ok(())
    }

    fn set_status(&mut self, status: CommandStatus) -> anyhow::Result<()> {
        self.push(CalculatorCall::SetStatus(status));
        Ok(())
    }

    fn detailed_status(&self) -> Option<DetailedStatus> {
        None
    }

    fn boxed_clone(&self) -> Box<dyn DetailedStatusCalculator> {
        Box::new(self.clone())
    }
}
