//! Representation engine: picks a canonical surface form per component
//! across all of a structure's matches (spec §5).

pub mod assigner;
pub mod lookup;
pub mod recipe;

pub use assigner::{add_words, build_recipes, collapse_casing, render_all, Recipe};
pub use lookup::{FileLookupBackend, HttpLookupBackend, LookupBackend, LookupForm};
pub use recipe::{
    FormCounts, LemmaRecipe, LexisRecipe, MsdSelector, Rendered, WordFormAgreementRecipe, WordFormAllRecipe, WordFormAnyRecipe,
    WordFormMsdRecipe,
};
