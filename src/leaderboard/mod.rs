mod bucket;
mod models;
mod store;

pub use bucket::{rank_entries, ranking_order, Bucket};
pub use models::{BucketKey, BucketStats, GlobalStats, LeaderboardEntry, SubmissionMetadata};
pub use store::{LeaderboardStore, UpsertOutcome};
