use tracing::{info_span, Span};

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Persona;

#[derive(Copy, Clone, Debug)]
pub enum Phase {
    Load,
    Prompt,
    CallLlm,
    Write,
}

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Prompt => "prompt",
            Phase::CallLlm => "call_llm",
            Phase::Write => "write",
        }
    }

    fn span(&self) -> Span {
        match self {
            Phase::Load => info_span!("load"),
            Phase::Prompt => info_span!("prompt"),
            Phase::CallLlm => info_span!("call_llm"),
            Phase::Write => info_span!("write"),
        }
    }
}

impl OpMarker for Persona {
    const NAME: &'static str = "persona";
    type Phase = Phase;

    fn root_span() -> Span {
        info_span!("persona")
    }
}
