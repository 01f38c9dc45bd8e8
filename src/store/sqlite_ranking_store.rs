use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Row};
use tracing::debug;

use super::trait_def::{
    AthleteStore, BadgeStore, HistoryStore, LeaderboardPersistence, SubmissionStore,
    SubmissionWrite,
};
use crate::athlete::{new_athlete_id, normalize_handle, Athlete, AthleteId};
use crate::evaluation::{Badge, BadgeKind, BadgeTier, ComponentScores, EarnedBadge};
use crate::history::HistoryRecord;
use crate::leaderboard::{BucketKey, LeaderboardEntry};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};

const ATHLETE_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "athlete",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
const ATHLETE_TABLE_V_0: Table = Table {
    name: "athlete",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_athlete_handle", "handle")],
    unique_constraints: &[],
};

const LEADERBOARD_ENTRY_TABLE_V_0: Table = Table {
    name: "leaderboard_entry",
    columns: &[
        sqlite_column!("sport", &SqlType::Text, non_null = true),
        sqlite_column!("level", &SqlType::Text, non_null = true),
        sqlite_column!(
            "athlete_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ATHLETE_FOREIGN_KEY)
        ),
        sqlite_column!("score", &SqlType::Real, non_null = true),
        sqlite_column!("best_score", &SqlType::Real, non_null = true),
        sqlite_column!("average_score", &SqlType::Real, non_null = true),
        sqlite_column!("previous_score", &SqlType::Real, non_null = true),
        sqlite_column!("total_submissions", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "flagged_submissions",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("rank", &SqlType::Integer, non_null = true),
        sqlite_column!("improvement", &SqlType::Real, non_null = true),
        sqlite_column!("last_updated", &SqlType::Integer, non_null = true),
        sqlite_column!("update_seq", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_leaderboard_entry_athlete", "athlete_id")],
    unique_constraints: &[&["sport", "level", "athlete_id"]],
};

const HISTORY_RECORD_TABLE_V_0: Table = Table {
    name: "history_record",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "athlete_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ATHLETE_FOREIGN_KEY)
        ),
        sqlite_column!("sport", &SqlType::Text, non_null = true),
        sqlite_column!("level", &SqlType::Text, non_null = true),
        sqlite_column!("timestamp", &SqlType::Integer, non_null = true),
        sqlite_column!("score", &SqlType::Real, non_null = true),
        sqlite_column!("form", &SqlType::Real, non_null = true),
        sqlite_column!("technique", &SqlType::Real, non_null = true),
        sqlite_column!("movement", &SqlType::Real, non_null = true),
        sqlite_column!("balance", &SqlType::Real, non_null = true),
        sqlite_column!("posture", &SqlType::Real, non_null = true),
        sqlite_column!("consistency", &SqlType::Real, non_null = true),
        sqlite_column!("timing", &SqlType::Real, non_null = true),
        sqlite_column!("cheat_detected", &SqlType::Integer, non_null = true),
        sqlite_column!("duration_seconds", &SqlType::Real, non_null = true),
        sqlite_column!("frame_count", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_history_record_athlete", "athlete_id")],
    unique_constraints: &[],
};

/// V 1
const ATHLETE_BADGE_TABLE_V_1: Table = Table {
    name: "athlete_badge",
    columns: &[
        sqlite_column!(
            "athlete_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ATHLETE_FOREIGN_KEY)
        ),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("tier", &SqlType::Text, non_null = true),
        sqlite_column!("earned_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["athlete_id", "kind"]],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            ATHLETE_TABLE_V_0,
            LEADERBOARD_ENTRY_TABLE_V_0,
            HISTORY_RECORD_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            ATHLETE_TABLE_V_0,
            LEADERBOARD_ENTRY_TABLE_V_0,
            HISTORY_RECORD_TABLE_V_0,
            ATHLETE_BADGE_TABLE_V_1,
        ],
        migration: Some(|conn: &Connection| ATHLETE_BADGE_TABLE_V_1.create(conn)),
    },
];

const LEADERBOARD_COLUMNS: &str = "sport, level, athlete_id, score, best_score, average_score, \
    previous_score, total_submissions, flagged_submissions, rank, improvement, last_updated, \
    update_seq";

const HISTORY_COLUMNS: &str = "athlete_id, sport, level, timestamp, score, form, technique, \
    movement, balance, posture, consistency, timing, cheat_detected, duration_seconds, frame_count";

#[derive(Clone)]
pub struct SqliteRankingStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRankingStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned(db_path.as_ref(), VERSIONED_SCHEMAS)
            .with_context(|| format!("Failed to open ranking db {:?}", db_path.as_ref()))?;
        Ok(SqliteRankingStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Ranking db connection mutex poisoned"))
    }
}

fn athlete_from_row(row: &Row) -> rusqlite::Result<Athlete> {
    Ok(Athlete {
        id: row.get(0)?,
        handle: row.get(1)?,
        created: row.get(2)?,
    })
}

fn entry_from_row(row: &Row) -> rusqlite::Result<LeaderboardEntry> {
    Ok(LeaderboardEntry {
        sport: row.get(0)?,
        level: row.get(1)?,
        athlete_id: row.get(2)?,
        score: row.get(3)?,
        best_score: row.get(4)?,
        average_score: row.get(5)?,
        previous_score: row.get(6)?,
        total_submissions: row.get(7)?,
        flagged_submissions: row.get(8)?,
        rank: row.get(9)?,
        improvement: row.get(10)?,
        last_updated: row.get(11)?,
        update_seq: row.get::<_, i64>(12)? as u64,
    })
}

fn record_from_row(row: &Row) -> rusqlite::Result<HistoryRecord> {
    Ok(HistoryRecord {
        athlete_id: row.get(0)?,
        sport: row.get(1)?,
        level: row.get(2)?,
        timestamp: row.get(3)?,
        score: row.get(4)?,
        components: ComponentScores {
            form: row.get(5)?,
            technique: row.get(6)?,
            movement: row.get(7)?,
            balance: row.get(8)?,
            posture: row.get(9)?,
            consistency: row.get(10)?,
            timing: row.get(11)?,
        },
        cheat_detected: row.get(12)?,
        duration_seconds: row.get(13)?,
        frame_count: row.get(14)?,
    })
}

fn badge_from_row(row: &Row) -> rusqlite::Result<(String, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn earned_badge(kind: &str, tier: &str, earned_at: i64) -> Result<EarnedBadge> {
    Ok(EarnedBadge {
        kind: BadgeKind::from_name(kind).with_context(|| format!("Unknown badge kind {}", kind))?,
        tier: BadgeTier::from_name(tier).with_context(|| format!("Unknown badge tier {}", tier))?,
        earned_at,
    })
}

/// Upserts every entry of the bucket.
fn write_bucket(conn: &Connection, key: &BucketKey, entries: &[LeaderboardEntry]) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT (sport, level, athlete_id) DO UPDATE SET
            score = excluded.score,
            best_score = excluded.best_score,
            average_score = excluded.average_score,
            previous_score = excluded.previous_score,
            total_submissions = excluded.total_submissions,
            flagged_submissions = excluded.flagged_submissions,
            rank = excluded.rank,
            improvement = excluded.improvement,
            last_updated = excluded.last_updated,
            update_seq = excluded.update_seq",
        LEADERBOARD_ENTRY_TABLE_V_0.name, LEADERBOARD_COLUMNS
    ))?;
    for entry in entries {
        stmt.execute(params![
            key.sport,
            key.level,
            entry.athlete_id,
            entry.score,
            entry.best_score,
            entry.average_score,
            entry.previous_score,
            entry.total_submissions,
            entry.flagged_submissions,
            entry.rank,
            entry.improvement,
            entry.last_updated,
            entry.update_seq as i64,
        ])
        .with_context(|| format!("Failed to save entry of {} in {}", entry.athlete_id, key))?;
    }
    Ok(())
}

/// Inserts the record and prunes the athlete's history down to `retention`.
/// Returns the number of pruned records.
fn write_history_record(conn: &Connection, record: &HistoryRecord, retention: usize) -> Result<usize> {
    let c = &record.components;
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            HISTORY_RECORD_TABLE_V_0.name, HISTORY_COLUMNS
        ),
        params![
            record.athlete_id,
            record.sport,
            record.level,
            record.timestamp,
            record.score,
            c.form,
            c.technique,
            c.movement,
            c.balance,
            c.posture,
            c.consistency,
            c.timing,
            record.cheat_detected,
            record.duration_seconds,
            record.frame_count,
        ],
    )
    .with_context(|| format!("Failed to append history of {}", record.athlete_id))?;
    let pruned = conn.execute(
        "DELETE FROM history_record WHERE athlete_id = ?1 AND id NOT IN (
            SELECT id FROM history_record WHERE athlete_id = ?1 ORDER BY id DESC LIMIT ?2
         )",
        params![record.athlete_id, retention as i64],
    )?;
    Ok(pruned)
}

/// Inserts new badges and upgrades silver ones to gold. Never downgrades.
fn write_badges(conn: &Connection, athlete_id: &str, badges: &[Badge], earned_at: i64) -> Result<()> {
    if badges.is_empty() {
        return Ok(());
    }
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {table} (athlete_id, kind, tier, earned_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (athlete_id, kind) DO UPDATE SET
            tier = excluded.tier,
            earned_at = excluded.earned_at
         WHERE {table}.tier = '{silver}' AND excluded.tier = '{gold}'",
        table = ATHLETE_BADGE_TABLE_V_1.name,
        silver = BadgeTier::Silver.as_str(),
        gold = BadgeTier::Gold.as_str()
    ))?;
    for badge in badges {
        stmt.execute(params![
            athlete_id,
            badge.kind.as_str(),
            badge.tier.as_str(),
            earned_at
        ])
        .with_context(|| {
            format!(
                "Failed to grant {} badge to {}",
                badge.kind.as_str(),
                athlete_id
            )
        })?;
    }
    Ok(())
}

impl AthleteStore for SqliteRankingStore {
    fn create_athlete(&self, handle: &str) -> Result<AthleteId> {
        let handle = normalize_handle(handle)?;
        let id = new_athlete_id();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO athlete (id, handle) VALUES (?1, ?2)",
            params![id, handle],
        )
        .with_context(|| format!("Failed to create athlete {}", handle))?;
        debug!("Created athlete {} with id {}", handle, id);
        Ok(id)
    }

    fn get_athlete(&self, athlete_id: &str) -> Result<Option<Athlete>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, handle, created FROM athlete WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![athlete_id], athlete_from_row)?;
        Ok(rows.next().transpose()?)
    }

    fn get_athlete_by_handle(&self, handle: &str) -> Result<Option<Athlete>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, handle, created FROM athlete WHERE handle = ?1")?;
        let mut rows = stmt.query_map(params![handle.trim()], athlete_from_row)?;
        Ok(rows.next().transpose()?)
    }

    fn list_athletes(&self) -> Result<Vec<Athlete>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, handle, created FROM athlete ORDER BY handle")?;
        let athletes = stmt
            .query_map([], athlete_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(athletes)
    }
}

impl LeaderboardPersistence for SqliteRankingStore {
    fn load_leaderboard_entries(&self) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY sport, level, rank",
            LEADERBOARD_COLUMNS, LEADERBOARD_ENTRY_TABLE_V_0.name
        ))?;
        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn save_bucket(&self, key: &BucketKey, entries: &[LeaderboardEntry]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_bucket(&tx, key, entries)?;
        tx.commit()?;
        Ok(())
    }
}

impl HistoryStore for SqliteRankingStore {
    fn append_history_record(&self, record: &HistoryRecord, retention: usize) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let pruned = write_history_record(&tx, record, retention)?;
        tx.commit()?;
        Ok(pruned)
    }

    fn get_history_records(&self, athlete_id: &str) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE athlete_id = ?1 ORDER BY id",
            HISTORY_COLUMNS, HISTORY_RECORD_TABLE_V_0.name
        ))?;
        let records = stmt
            .query_map(params![athlete_id], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn load_all_history_records(&self) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY id",
            HISTORY_COLUMNS, HISTORY_RECORD_TABLE_V_0.name
        ))?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl BadgeStore for SqliteRankingStore {
    fn save_badges(&self, athlete_id: &str, badges: &[Badge], earned_at: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_badges(&tx, athlete_id, badges, earned_at)?;
        tx.commit()?;
        Ok(())
    }

    fn get_athlete_badges(&self, athlete_id: &str) -> Result<Vec<EarnedBadge>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT kind, tier, earned_at FROM {} WHERE athlete_id = ?1 ORDER BY earned_at, kind",
            ATHLETE_BADGE_TABLE_V_1.name
        ))?;
        let rows = stmt
            .query_map(params![athlete_id], badge_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.iter()
            .map(|(kind, tier, earned_at)| earned_badge(kind, tier, *earned_at))
            .collect()
    }
}

impl SubmissionStore for SqliteRankingStore {
    fn commit_submission(&self, write: &SubmissionWrite<'_>) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_bucket(&tx, write.key, write.entries)?;
        let pruned = write_history_record(&tx, write.record, write.history_retention)?;
        write_badges(
            &tx,
            &write.record.athlete_id,
            write.badges,
            write.record.timestamp,
        )?;
        tx.commit()?;
        debug!(
            "Committed submission of {} in {}",
            write.record.athlete_id, write.key
        );
        Ok(pruned)
    }
}
