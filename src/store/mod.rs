mod sqlite_ranking_store;
mod trait_def;

pub use sqlite_ranking_store::SqliteRankingStore;
pub use trait_def::{
    AthleteStore, BadgeStore, HistoryStore, LeaderboardPersistence, RankingStore,
    SubmissionStore, SubmissionWrite,
};
