pub mod persona;
pub mod probe;
pub mod run;
pub mod scrape;
