//! Common test infrastructure
//!
//! Every test builds its own pipeline on a fresh SQLite database in a
//! temporary directory. Tests should only import from this module.

mod constants;
mod fixtures;
mod pipeline;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{empty_vector, history_record, steady_vector, stretched_vector};
#[allow(unused_imports)]
pub use pipeline::{TestPipeline, DB_FILE_NAME};
