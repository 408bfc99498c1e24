//! Depth-first dependency-tree subgraph matcher (spec §4.2).

pub mod matcher;

pub use matcher::{match_sentence, Assignment};
