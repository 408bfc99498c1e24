//! Shared foundation for the syncoll workspace: the token/sentence model,
//! the tag-model layer (compact/featural conversion, content-word scoring),
//! the shared error type, and tracing setup.

pub mod error;
pub mod tagmodel;
pub mod token;
pub mod tracing_setup;

pub use error::{SyncollError, SyncollResult};
pub use tagmodel::{determine_ppb, determine_ppb_ud, msd_to_properties, translate_deprel, translate_sl_to_en, Properties};
pub use token::{prepare_ids, Sentence, Tag, Token};
