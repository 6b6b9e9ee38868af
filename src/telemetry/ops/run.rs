use tracing::{info_span, Span};

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Run;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Scrape, Persona }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Scrape => "scrape",
            Phase::Persona => "persona",
        }
    }
    fn span(&self) -> Span {
        match self {
            Phase::Scrape => info_span!("scrape"),
            Phase::Persona => info_span!("persona"),
        }
    }
}

impl OpMarker for Run {
    const NAME: &'static str = "run";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("run") }
}
