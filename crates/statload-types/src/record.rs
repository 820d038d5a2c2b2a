//! Domain records, table shapes, and the row representation handed to
//! store writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationIssue;

/// Earliest season any record may carry.
pub const MIN_SEASON: i64 = 1920;
/// Latest season any record may carry.
pub const MAX_SEASON: i64 = 2030;

/// A single column value in store-neutral form.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

impl SqlValue {
    fn opt_int(v: Option<i64>) -> Self {
        v.map_or(Self::Null, Self::Integer)
    }

    fn opt_real(v: Option<f64>) -> Self {
        v.map_or(Self::Null, Self::Real)
    }

    fn opt_text(v: Option<&str>) -> Self {
        v.map_or(Self::Null, |s| Self::Text(s.to_owned()))
    }

    fn timestamp(v: DateTime<Utc>) -> Self {
        Self::Text(v.to_rfc3339())
    }
}

/// Static description of a target table: column order the writer must
/// follow, and which columns form the unique key.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub key_columns: &'static [&'static str],
}

impl TableSpec {
    /// Columns an upsert is allowed to overwrite (everything outside
    /// the unique key).
    #[must_use]
    pub fn updatable_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| !self.key_columns.contains(c))
            .copied()
            .collect()
    }
}

/// Players table: one row per athlete, keyed by the stable site id.
pub static PLAYERS: TableSpec = TableSpec {
    name: "players",
    columns: &[
        "player_id",
        "name",
        "profile_url",
        "position",
        "height_inches",
        "weight_lbs",
        "college",
        "scraped_at",
        "updated_at",
    ],
    key_columns: &["player_id"],
};

/// Season passing lines, keyed by player and season.
pub static PASSING_SEASONS: TableSpec = TableSpec {
    name: "passing_seasons",
    columns: &[
        "player_id",
        "season",
        "team",
        "games",
        "games_started",
        "completions",
        "attempts",
        "completion_pct",
        "yards",
        "touchdowns",
        "interceptions",
        "longest_pass",
        "rating",
        "sacks",
        "sack_yards",
        "net_yards_per_attempt",
        "scraped_at",
        "updated_at",
    ],
    key_columns: &["player_id", "season"],
};

/// Categorical splits of a season line, keyed by player, season, and
/// the split dimension/value pair.
pub static PASSING_SPLITS: TableSpec = TableSpec {
    name: "passing_splits",
    columns: &[
        "player_id",
        "season",
        "split_kind",
        "split_value",
        "games",
        "wins",
        "losses",
        "ties",
        "completions",
        "attempts",
        "completion_pct",
        "yards",
        "touchdowns",
        "interceptions",
        "rating",
        "sacks",
        "rush_attempts",
        "rush_yards",
        "rush_touchdowns",
        "scraped_at",
        "updated_at",
    ],
    key_columns: &["player_id", "season", "split_kind", "split_value"],
};

/// Anything the engine can plan, validate, and hand to a table writer.
pub trait Record {
    /// Target table shape.
    fn table(&self) -> &'static TableSpec;

    /// Column values in `table().columns` order.
    fn values(&self) -> Vec<SqlValue>;

    /// Human-readable unique key, used in error and log messages.
    fn key_display(&self) -> String;

    /// All field-level problems, empty when the record is well formed.
    fn validate(&self) -> Vec<ValidationIssue>;
}

fn check_required_text(issues: &mut Vec<ValidationIssue>, field: &str, value: &str) {
    if value.trim().is_empty() {
        issues.push(ValidationIssue::new(field, "must not be empty"));
    }
}

fn check_season(issues: &mut Vec<ValidationIssue>, season: i64) {
    if !(MIN_SEASON..=MAX_SEASON).contains(&season) {
        issues.push(ValidationIssue::new(
            "season",
            format!("{season} is outside the allowed range {MIN_SEASON}..={MAX_SEASON}"),
        ));
    }
}

fn check_non_negative(issues: &mut Vec<ValidationIssue>, field: &str, value: Option<i64>) {
    if let Some(v) = value {
        if v < 0 {
            issues.push(ValidationIssue::new(field, format!("{v} must not be negative")));
        }
    }
}

fn check_pct(issues: &mut Vec<ValidationIssue>, field: &str, value: Option<f64>) {
    if let Some(v) = value {
        if !(0.0..=100.0).contains(&v) {
            issues.push(ValidationIssue::new(
                field,
                format!("{v} is outside the range 0..=100"),
            ));
        }
    }
}

fn check_completions_vs_attempts(
    issues: &mut Vec<ValidationIssue>,
    completions: Option<i64>,
    attempts: Option<i64>,
) {
    if let (Some(c), Some(a)) = (completions, attempts) {
        if c > a {
            issues.push(ValidationIssue::new(
                "completions",
                format!("{c} exceeds attempts {a}"),
            ));
        }
    }
}

/// One athlete's identity row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_id: String,
    pub name: String,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub height_inches: Option<i64>,
    #[serde(default)]
    pub weight_lbs: Option<i64>,
    #[serde(default)]
    pub college: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for PlayerRecord {
    fn table(&self) -> &'static TableSpec {
        &PLAYERS
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.player_id.clone()),
            SqlValue::Text(self.name.clone()),
            SqlValue::opt_text(self.profile_url.as_deref()),
            SqlValue::opt_text(self.position.as_deref()),
            SqlValue::opt_int(self.height_inches),
            SqlValue::opt_int(self.weight_lbs),
            SqlValue::opt_text(self.college.as_deref()),
            SqlValue::timestamp(self.scraped_at),
            SqlValue::timestamp(self.updated_at),
        ]
    }

    fn key_display(&self) -> String {
        self.player_id.clone()
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        check_required_text(&mut issues, "player_id", &self.player_id);
        check_required_text(&mut issues, "name", &self.name);
        if let Some(h) = self.height_inches {
            if !(60..=84).contains(&h) {
                issues.push(ValidationIssue::new(
                    "height_inches",
                    format!("{h} is outside the plausible range 60..=84"),
                ));
            }
        }
        if let Some(w) = self.weight_lbs {
            if !(150..=350).contains(&w) {
                issues.push(ValidationIssue::new(
                    "weight_lbs",
                    format!("{w} is outside the plausible range 150..=350"),
                ));
            }
        }
        issues
    }
}

/// One player's passing line for a full season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassingSeason {
    pub player_id: String,
    pub season: i64,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub games: Option<i64>,
    #[serde(default)]
    pub games_started: Option<i64>,
    #[serde(default)]
    pub completions: Option<i64>,
    #[serde(default)]
    pub attempts: Option<i64>,
    #[serde(default)]
    pub completion_pct: Option<f64>,
    #[serde(default)]
    pub yards: Option<i64>,
    #[serde(default)]
    pub touchdowns: Option<i64>,
    #[serde(default)]
    pub interceptions: Option<i64>,
    #[serde(default)]
    pub longest_pass: Option<i64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub sacks: Option<i64>,
    #[serde(default)]
    pub sack_yards: Option<i64>,
    #[serde(default)]
    pub net_yards_per_attempt: Option<f64>,
    pub scraped_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for PassingSeason {
    fn table(&self) -> &'static TableSpec {
        &PASSING_SEASONS
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.player_id.clone()),
            SqlValue::Integer(self.season),
            SqlValue::opt_text(self.team.as_deref()),
            SqlValue::opt_int(self.games),
            SqlValue::opt_int(self.games_started),
            SqlValue::opt_int(self.completions),
            SqlValue::opt_int(self.attempts),
            SqlValue::opt_real(self.completion_pct),
            SqlValue::opt_int(self.yards),
            SqlValue::opt_int(self.touchdowns),
            SqlValue::opt_int(self.interceptions),
            SqlValue::opt_int(self.longest_pass),
            SqlValue::opt_real(self.rating),
            SqlValue::opt_int(self.sacks),
            SqlValue::opt_int(self.sack_yards),
            SqlValue::opt_real(self.net_yards_per_attempt),
            SqlValue::timestamp(self.scraped_at),
            SqlValue::timestamp(self.updated_at),
        ]
    }

    fn key_display(&self) -> String {
        format!("{}/{}", self.player_id, self.season)
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        check_required_text(&mut issues, "player_id", &self.player_id);
        check_season(&mut issues, self.season);
        for (field, value) in [
            ("games", self.games),
            ("games_started", self.games_started),
            ("completions", self.completions),
            ("attempts", self.attempts),
            ("yards", self.yards),
            ("touchdowns", self.touchdowns),
            ("interceptions", self.interceptions),
            ("sacks", self.sacks),
        ] {
            check_non_negative(&mut issues, field, value);
        }
        check_pct(&mut issues, "completion_pct", self.completion_pct);
        check_completions_vs_attempts(&mut issues, self.completions, self.attempts);
        issues
    }
}

/// One categorical slice (home/away, by down, etc.) of a passing season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassingSplit {
    pub player_id: String,
    pub season: i64,
    pub split_kind: String,
    pub split_value: String,
    #[serde(default)]
    pub games: Option<i64>,
    #[serde(default)]
    pub wins: Option<i64>,
    #[serde(default)]
    pub losses: Option<i64>,
    #[serde(default)]
    pub ties: Option<i64>,
    #[serde(default)]
    pub completions: Option<i64>,
    #[serde(default)]
    pub attempts: Option<i64>,
    #[serde(default)]
    pub completion_pct: Option<f64>,
    #[serde(default)]
    pub yards: Option<i64>,
    #[serde(default)]
    pub touchdowns: Option<i64>,
    #[serde(default)]
    pub interceptions: Option<i64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub sacks: Option<i64>,
    #[serde(default)]
    pub rush_attempts: Option<i64>,
    #[serde(default)]
    pub rush_yards: Option<i64>,
    #[serde(default)]
    pub rush_touchdowns: Option<i64>,
    pub scraped_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for PassingSplit {
    fn table(&self) -> &'static TableSpec {
        &PASSING_SPLITS
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.player_id.clone()),
            SqlValue::Integer(self.season),
            SqlValue::Text(self.split_kind.clone()),
            SqlValue::Text(self.split_value.clone()),
            SqlValue::opt_int(self.games),
            SqlValue::opt_int(self.wins),
            SqlValue::opt_int(self.losses),
            SqlValue::opt_int(self.ties),
            SqlValue::opt_int(self.completions),
            SqlValue::opt_int(self.attempts),
            SqlValue::opt_real(self.completion_pct),
            SqlValue::opt_int(self.yards),
            SqlValue::opt_int(self.touchdowns),
            SqlValue::opt_int(self.interceptions),
            SqlValue::opt_real(self.rating),
            SqlValue::opt_int(self.sacks),
            SqlValue::opt_int(self.rush_attempts),
            SqlValue::opt_int(self.rush_yards),
            SqlValue::opt_int(self.rush_touchdowns),
            SqlValue::timestamp(self.scraped_at),
            SqlValue::timestamp(self.updated_at),
        ]
    }

    fn key_display(&self) -> String {
        format!(
            "{}/{}/{}={}",
            self.player_id, self.season, self.split_kind, self.split_value
        )
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        check_required_text(&mut issues, "player_id", &self.player_id);
        check_season(&mut issues, self.season);
        check_required_text(&mut issues, "split_kind", &self.split_kind);
        check_required_text(&mut issues, "split_value", &self.split_value);
        for (field, value) in [
            ("games", self.games),
            ("wins", self.wins),
            ("losses", self.losses),
            ("ties", self.ties),
            ("completions", self.completions),
            ("attempts", self.attempts),
            ("yards", self.yards),
            ("touchdowns", self.touchdowns),
            ("interceptions", self.interceptions),
            ("sacks", self.sacks),
            ("rush_attempts", self.rush_attempts),
        ] {
            check_non_negative(&mut issues, field, value);
        }
        check_pct(&mut issues, "completion_pct", self.completion_pct);
        check_completions_vs_attempts(&mut issues, self.completions, self.attempts);
        issues
    }
}

/// Conflict handling the engine resolved for one table write.
///
/// Carried as a SQL fragment so writers stay strategy-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteClause {
    /// `ON CONFLICT ...` suffix appended to the insert, if any.
    pub on_conflict: Option<String>,
}
