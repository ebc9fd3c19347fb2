//! Injection engine: synthesize metadata and write it into archives.

mod engine;
mod types;

pub use engine::InjectionEngine;
pub use types::{FileOutcome, InjectionResult};
