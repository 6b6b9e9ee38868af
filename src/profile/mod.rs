pub mod snapshot;
pub mod types;
pub mod url;

pub use types::{ItemKind, ProfileSnapshot, ScrapedItem};
