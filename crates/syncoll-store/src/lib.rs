//! Collocation store: SQLite persistence, step idempotency, frequency
//! filtering, dispersion and statistics (spec §6 "Collocation store").

pub mod schema;
pub mod statistics;
pub mod store;

pub use schema::init_schema;
pub use statistics::{delta_p_1_to_2, delta_p_2_to_1, distinct_forms, log_dice, log_dice_all};
pub use store::{MatchedToken, Store};
