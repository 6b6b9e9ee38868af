use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Scrape;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Resolve, Launch, Navigate, Dismiss, WaitReady, Scroll, Collect, Extract, Write }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Resolve => "resolve",
        Phase::Launch => "launch",
        Phase::Navigate => "navigate",
        Phase::Dismiss => "dismiss",
        Phase::WaitReady => "wait_ready",
        Phase::Scroll => "scroll",
        Phase::Collect => "collect",
        Phase::Extract => "extract",
        Phase::Write => "write",
    }}
    fn span(&self) -> Span { match self {
        Phase::Resolve => info_span!("resolve"),
        Phase::Launch => info_span!("launch"),
        Phase::Navigate => info_span!("navigate"),
        Phase::Dismiss => info_span!("dismiss"),
        Phase::WaitReady => info_span!("wait_ready"),
        Phase::Scroll => info_span!("scroll"),
        Phase::Collect => info_span!("collect"),
        Phase::Extract => info_span!("extract"),
        Phase::Write => info_span!("write"),
    }}
}

impl OpMarker for Scrape {
    const NAME: &'static str = "scrape";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("scrape") }
}
