//! Subprocess boundary: everything that launches the external tagging tool.

pub mod tagger;

pub use tagger::{ComicTaggerCli, Tagger, TaggerError};
