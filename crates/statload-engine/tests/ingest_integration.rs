use chrono::Utc;
use statload_engine::config::parser::parse_job_str;
use statload_engine::{run_operation, CancelToken, OperationOptions, TableLoad};
use statload_store::{RunLog, SqliteWriter};
use statload_types::config::{BulkConfig, ConflictStrategy};
use statload_types::record::{PassingSeason, PassingSplit, PlayerRecord};

fn player(id: &str, name: &str) -> PlayerRecord {
    PlayerRecord {
        player_id: id.to_owned(),
        name: name.to_owned(),
        profile_url: Some(format!("https://example.com/players/{id}.htm")),
        position: Some("QB".to_owned()),
        height_inches: Some(75),
        weight_lbs: Some(225),
        college: Some("State".to_owned()),
        scraped_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn season(id: &str, year: i64, yards: i64) -> PassingSeason {
    PassingSeason {
        player_id: id.to_owned(),
        season: year,
        team: Some("KAN".to_owned()),
        games: Some(17),
        games_started: Some(17),
        completions: Some(400),
        attempts: Some(600),
        completion_pct: Some(66.7),
        yards: Some(yards),
        touchdowns: Some(38),
        interceptions: Some(11),
        longest_pass: Some(72),
        rating: Some(103.4),
        sacks: Some(25),
        sack_yards: Some(160),
        net_yards_per_attempt: Some(7.3),
        scraped_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn split(id: &str, year: i64, kind: &str, value: &str) -> PassingSplit {
    PassingSplit {
        player_id: id.to_owned(),
        season: year,
        split_kind: kind.to_owned(),
        split_value: value.to_owned(),
        games: Some(8),
        wins: Some(6),
        losses: Some(2),
        ties: Some(0),
        completions: Some(200),
        attempts: Some(300),
        completion_pct: Some(66.7),
        yards: Some(2400),
        touchdowns: Some(20),
        interceptions: Some(5),
        rating: Some(104.0),
        sacks: Some(12),
        rush_attempts: Some(30),
        rush_yards: Some(150),
        rush_touchdowns: Some(2),
        scraped_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn load_everything(writer: &SqliteWriter, config: &BulkConfig) -> statload_engine::coordinator::OperationReport {
    run_operation(
        writer,
        Some(writer as &dyn RunLog),
        vec![
            TableLoad::Players(vec![player("mahompa00", "Patrick Mahomes")]),
            TableLoad::Seasons(vec![
                season("mahompa00", 2022, 5250),
                season("mahompa00", 2023, 4183),
            ]),
            TableLoad::Splits(vec![
                split("mahompa00", 2022, "place", "Home"),
                split("mahompa00", 2022, "place", "Road"),
            ]),
        ],
        config,
        &OperationOptions::default(),
        &CancelToken::new(),
    )
    .expect("operation should run")
}

#[test]
fn full_ingest_lands_all_tables() {
    let writer = SqliteWriter::open_in_memory().unwrap();
    let report = load_everything(&writer, &BulkConfig::default());

    assert!(report.is_clean());
    assert_eq!(report.total_succeeded(), 5);
    assert_eq!(writer.count_rows("players").unwrap(), 1);
    assert_eq!(writer.count_rows("passing_seasons").unwrap(), 2);
    assert_eq!(writer.count_rows("passing_splits").unwrap(), 2);

    let runs = writer.recent_runs(10).unwrap();
    assert_eq!(runs.len(), 3);
    assert!(runs.iter().all(|r| r.status == "completed"));
    // Newest first, so the splits run comes back on top.
    assert_eq!(runs[0].table_name, "passing_splits");
}

#[test]
fn rerun_with_update_strategy_overwrites_in_place() {
    let writer = SqliteWriter::open_in_memory().unwrap();
    let config = BulkConfig::default();
    load_everything(&writer, &config);

    // Second scrape of the same seasons with corrected yardage.
    let report = run_operation(
        &writer,
        None,
        vec![TableLoad::Seasons(vec![season("mahompa00", 2022, 5300)])],
        &config,
        &OperationOptions::default(),
        &CancelToken::new(),
    )
    .unwrap();
    assert!(report.is_clean());
    assert_eq!(writer.count_rows("passing_seasons").unwrap(), 2);
}

#[test]
fn ignore_strategy_keeps_first_write_and_counts_skips() {
    let writer = SqliteWriter::open_in_memory().unwrap();
    let config = BulkConfig {
        conflict_strategy: ConflictStrategy::Ignore,
        ..BulkConfig::default()
    };
    load_everything(&writer, &config);

    let report = run_operation(
        &writer,
        None,
        vec![TableLoad::Players(vec![player("mahompa00", "Shadow Row")])],
        &config,
        &OperationOptions::default(),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(report.results[0].skipped, 1);
    assert_eq!(report.results[0].succeeded, 0);
    assert!(report.is_clean());
    assert_eq!(writer.count_rows("players").unwrap(), 1);
}

#[test]
fn fail_strategy_reports_duplicates_as_failures() {
    let writer = SqliteWriter::open_in_memory().unwrap();
    let config = BulkConfig {
        conflict_strategy: ConflictStrategy::Fail,
        ..BulkConfig::default()
    };
    load_everything(&writer, &config);

    let report = run_operation(
        &writer,
        Some(&writer as &dyn RunLog),
        vec![TableLoad::Players(vec![player("mahompa00", "Duplicate")])],
        &config,
        &OperationOptions::default(),
        &CancelToken::new(),
    )
    .unwrap();
    assert!(!report.is_clean());
    assert_eq!(report.results[0].failed, 1);
    assert!(report.results[0].errors[0].contains("constraint"));
    assert_eq!(writer.count_rows("players").unwrap(), 1);

    let runs = writer.recent_runs(1).unwrap();
    assert_eq!(runs[0].status, "failed");
    let failures = writer.failed_records(runs[0].run_id).unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].0.contains("mahompa00"));
}

#[test]
fn invalid_records_are_persisted_for_replay() {
    let writer = SqliteWriter::open_in_memory().unwrap();
    let mut bad = season("mahompa00", 2022, 5000);
    bad.completions = Some(700);
    bad.attempts = Some(600);
    let report = run_operation(
        &writer,
        Some(&writer as &dyn RunLog),
        vec![TableLoad::Seasons(vec![bad, season("mahompa00", 2023, 4100)])],
        &BulkConfig::default(),
        &OperationOptions::default(),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(report.total_succeeded(), 1);
    assert_eq!(report.total_failed(), 1);
    assert_eq!(writer.count_rows("passing_seasons").unwrap(), 1);

    let runs = writer.recent_runs(1).unwrap();
    let failures = writer.failed_records(runs[0].run_id).unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].1.contains("exceeds attempts"));
}

#[test]
fn job_file_drives_an_ingest() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stats.db");
    std::env::set_var("STATLOAD_IT_DB", db_path.to_str().unwrap());
    let job = parse_job_str(
        "database: ${STATLOAD_IT_DB}\nbulk:\n  batch_size: 50\n  conflict_strategy: update\n",
    )
    .unwrap();
    std::env::remove_var("STATLOAD_IT_DB");

    let writer = SqliteWriter::open(&job.database).unwrap();
    let report = run_operation(
        &writer,
        None,
        vec![TableLoad::Players(vec![player("burrjo01", "Joe Burrow")])],
        &job.bulk,
        &OperationOptions {
            fail_fast: job.fail_fast,
            warn_unresolved_refs: job.warn_unresolved_refs,
        },
        &CancelToken::new(),
    )
    .unwrap();
    assert!(report.is_clean());
    assert_eq!(writer.count_rows("players").unwrap(), 1);
}
