pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

pub fn scrape() -> LogCtx<ops::scrape::Scrape> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn persona() -> LogCtx<ops::persona::Persona> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn probe() -> LogCtx<ops::probe::Probe> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn run() -> LogCtx<ops::run::Run> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
