use tracing::{info_span, Span};

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Probe;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Launch, Navigate, Patterns, Selectors }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Launch => "launch",
            Phase::Navigate => "navigate",
            Phase::Patterns => "patterns",
            Phase::Selectors => "selectors",
        }
    }
    fn span(&self) -> Span {
        match self {
            Phase::Launch => info_span!("launch"),
            Phase::Navigate => info_span!("navigate"),
            Phase::Patterns => info_span!("patterns"),
            Phase::Selectors => info_span!("selectors"),
        }
    }
}

impl OpMarker for Probe {
    const NAME: &'static str = "probe";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("probe") }
}
