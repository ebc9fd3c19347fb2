//! Metadata synthesizer: catalog record + issue identity -> ComicInfo document.
//!
//! Building and serializing are both pure; the archive adapter is the only
//! place the resulting bytes touch disk.

mod document;
mod xml;

pub use document::ComicInfo;
pub use xml::{read, serialize, XMLNS};
