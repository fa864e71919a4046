// Integration tests for hoopslog.
//
// These run the full summary pipeline against an in-memory SQLite store
// seeded from tests/fixtures and check the materialized table, its views and
// the exported CSV files.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use hoopslog_app::config::{Config, ReportConfig, TableNames};
use hoopslog_app::db::{Database, PLAYOFFS_VIEW, REGULAR_SEASON_VIEW};
use hoopslog_app::pipeline::{run_with_database, PipelineSummary};
use hoopslog_core::present::{DisplayRow, SplitDisplayRow};
use hoopslog_core::season::SeasonKey;

// ===========================================================================
// Test helpers
// ===========================================================================

const SAMPLE_STORE: &str = include_str!("fixtures/sample_store.sql");

fn seeded_db() -> Database {
    let db = Database::open(":memory:").expect("in-memory database should open");
    db.execute_batch(SAMPLE_STORE).expect("fixture should load");
    db
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 10)
        .unwrap()
        .and_hms_opt(18, 30, 0)
        .unwrap()
}

/// Inline config (no files) exporting into a fresh temp directory.
fn inline_config(name: &str) -> Config {
    let export_dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&export_dir);
    Config {
        db_path: ":memory:".into(),
        tables: TableNames {
            logs: "fantasy_logs".into(),
            players: "dim_players".into(),
            teams: "map_teams".into(),
            averages: "fantasy_averages".into(),
        },
        export_dir: export_dir.to_string_lossy().into_owned(),
        report: ReportConfig {
            window_size: 2,
            last_days: 5,
            seasons: vec![SeasonKey::Season { start_year: 2024 }],
            min_points_per_game: Some(5.0),
            reference_players: vec!["Nikola Jokic".into()],
            target_team: None,
            as_of: NaiveDate::from_ymd_opt(2025, 1, 10),
        },
    }
}

fn run(config: &Config) -> (Database, PipelineSummary) {
    let db = seeded_db();
    let summary = run_with_database(&db, config, now()).expect("pipeline should succeed");
    (db, summary)
}

/// Parsed CSV: header plus rows.
struct Csv {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Csv {
    fn read(path: &Path) -> Self {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        let header = rdr.headers().unwrap().iter().map(str::to_string).collect();
        let rows = rdr
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        Csv { header, rows }
    }

    fn column(&self, name: &str) -> usize {
        self.header
            .iter()
            .position(|h| h == name)
            .unwrap_or_else(|| panic!("no column {name}"))
    }

    fn values(&self, name: &str) -> Vec<&str> {
        let i = self.column(name);
        self.rows.iter().map(|r| r[i].as_str()).collect()
    }

    fn row_where(&self, name: &str, value: &str) -> Vec<&Vec<String>> {
        let i = self.column(name);
        self.rows.iter().filter(|r| r[i] == value).collect()
    }

    fn get<'a>(&self, row: &'a [String], name: &str) -> &'a str {
        &row[self.column(name)]
    }
}

fn export_named(summary: &PipelineSummary, base: &str) -> PathBuf {
    let file = format!("{base}_01-10-2025_183000.csv");
    summary
        .exports
        .iter()
        .find(|p| p.file_name().is_some_and(|n| n == file.as_str()))
        .cloned()
        .unwrap_or_else(|| panic!("{file} not exported: {:?}", summary.exports))
}

// ===========================================================================
// Materialized table and views
// ===========================================================================

#[test]
fn materializes_averages_and_views() {
    let config = inline_config("hoopslog_it_materialize");
    let (db, summary) = run(&config);

    // Regular: Jokic 2023-24, and Jokic, Murray, Brunson, unknown 2024-25.
    // Playoffs: Jokic 2025.
    assert_eq!(summary.averages_rows, 6);
    assert_eq!(db.row_count("fantasy_averages").unwrap(), 6);
    assert_eq!(db.row_count(REGULAR_SEASON_VIEW).unwrap(), 5);
    assert_eq!(db.row_count(PLAYOFFS_VIEW).unwrap(), 1);
    // Summer League row
    assert_eq!(summary.unrecognized_rows, 1);

    let _ = std::fs::remove_dir_all(&config.export_dir);
}

#[test]
fn rerun_replaces_materialized_rows() {
    let config = inline_config("hoopslog_it_rerun");
    let db = seeded_db();
    run_with_database(&db, &config, now()).unwrap();
    run_with_database(&db, &config, now()).unwrap();
    assert_eq!(db.row_count("fantasy_averages").unwrap(), 6);
    let _ = std::fs::remove_dir_all(&config.export_dir);
}

#[test]
fn missing_reference_table_fails_with_name() {
    let config = inline_config("hoopslog_it_missing");
    let db = seeded_db();
    db.execute_batch("DROP TABLE map_teams;").unwrap();
    let err = run_with_database(&db, &config, now()).unwrap_err();
    assert!(format!("{err:#}").contains("map_teams"));
    assert!(!Path::new(&config.export_dir).exists());
}

// ===========================================================================
// Exports
// ===========================================================================

#[test]
fn exports_every_report() {
    let config = inline_config("hoopslog_it_exports");
    let (_db, summary) = run(&config);
    assert_eq!(summary.exports.len(), 7);
    for base in [
        "player_averages_regular_season",
        "player_averages_playoffs",
        "slate_current_team",
        "slate_last_2_games",
        "slate_last_5_days",
        "slate_venue_split",
        "slate_date_split",
    ] {
        assert!(export_named(&summary, base).exists());
    }
    let _ = std::fs::remove_dir_all(&config.export_dir);
}

#[test]
fn season_view_exports() {
    let config = inline_config("hoopslog_it_season_views");
    let (_db, summary) = run(&config);

    let regular = Csv::read(&export_named(&summary, "player_averages_regular_season"));
    assert_eq!(regular.header, DisplayRow::COLUMNS.to_vec());
    assert_eq!(regular.rows.len(), 5);
    assert!(regular.values("SEASON_TYPE").iter().all(|t| *t == "Regular"));

    // Jokic's In-Season Tournament game counts toward the regular season.
    let jokic: Vec<_> = regular
        .row_where("PLAYER", "Nikola Jokic")
        .into_iter()
        .filter(|r| regular.get(r, "SEASON") == "2024-25")
        .collect();
    assert_eq!(jokic.len(), 1);
    assert_eq!(regular.get(jokic[0], "GP"), "5");
    assert_eq!(regular.get(jokic[0], "TEAM"), "DEN");

    // Unmapped player and team come through as empty fields.
    let unknown = regular.row_where("PLAYER_ID", "999");
    assert_eq!(unknown.len(), 1);
    assert_eq!(regular.get(unknown[0], "PLAYER"), "");
    assert_eq!(regular.get(unknown[0], "TEAM"), "");
    // single game: no deviation
    assert_eq!(regular.get(unknown[0], "STDV_FPPG"), "");

    let playoffs = Csv::read(&export_named(&summary, "player_averages_playoffs"));
    assert_eq!(playoffs.rows.len(), 1);
    let row = &playoffs.rows[0];
    assert_eq!(playoffs.get(row, "SEASON"), "2025");
    assert_eq!(playoffs.get(row, "GP"), "2");
    // no salaries logged in the playoffs
    assert_eq!(playoffs.get(row, "SALPG"), "");
    assert_eq!(playoffs.get(row, "FPPG").parse::<f64>().unwrap(), 68.0);

    let _ = std::fs::remove_dir_all(&config.export_dir);
}

#[test]
fn slate_reports_are_scoped_and_sorted() {
    let config = inline_config("hoopslog_it_slate");
    let (_db, summary) = run(&config);

    let current = Csv::read(&export_named(&summary, "slate_current_team"));
    // 2023-24 excluded by the season filter
    assert!(current.values("SEASON").iter().all(|s| *s == "2024-25"));
    assert_eq!(
        current.values("PLAYER"),
        vec!["Jamal Murray", "Nikola Jokic", "Jalen Brunson", ""]
    );

    let last_n = Csv::read(&export_named(&summary, "slate_last_2_games"));
    let jokic = last_n.row_where("PLAYER", "Nikola Jokic");
    // Jan 8 and Jan 6
    assert_eq!(last_n.get(jokic[0], "GP"), "2");
    assert_eq!(last_n.get(jokic[0], "FPPG").parse::<f64>().unwrap(), 59.13);
    assert_eq!(last_n.get(jokic[0], "MPG").parse::<f64>().unwrap(), 35.0);

    let recent = Csv::read(&export_named(&summary, "slate_last_5_days"));
    // Jan 6 through Jan 10; Brunson's last game was Jan 5
    assert_eq!(recent.values("PLAYER"), vec!["Jamal Murray", "Nikola Jokic"]);
    assert_eq!(recent.values("GP"), vec!["1", "2"]);

    let _ = std::fs::remove_dir_all(&config.export_dir);
}

#[test]
fn date_split_export() {
    let config = inline_config("hoopslog_it_date_split");
    let (_db, summary) = run(&config);

    let split = Csv::read(&export_named(&summary, "slate_date_split"));
    assert_eq!(split.header, SplitDisplayRow::COLUMNS.to_vec());
    // Brunson never shares a date with Jokic, so his ON side is empty and
    // fails the points filter.
    assert_eq!(split.values("PLAYER"), vec!["Jamal Murray", "Jamal Murray"]);
    assert_eq!(split.values("SPLIT"), vec!["ON", "OFF"]);
    assert_eq!(split.values("GP"), vec!["2", "1"]);
    assert_eq!(split.values("GS"), vec!["2", "0"]);

    let _ = std::fs::remove_dir_all(&config.export_dir);
}

#[test]
fn venue_split_export() {
    let config = inline_config("hoopslog_it_venue_split");
    let (_db, summary) = run(&config);

    let venue = Csv::read(&export_named(&summary, "slate_venue_split"));
    // unknown player's only game scores under the points floor
    assert!(venue.row_where("PLAYER_ID", "999").is_empty());
    let jokic = venue.row_where("PLAYER", "Nikola Jokic");
    let parts: Vec<_> = jokic
        .iter()
        .map(|r| (venue.get(r, "SPLIT"), venue.get(r, "GP")))
        .collect();
    assert_eq!(parts, vec![("H", "3"), ("R", "2")]);

    let _ = std::fs::remove_dir_all(&config.export_dir);
}

#[test]
fn no_reference_players_skips_date_split() {
    let mut config = inline_config("hoopslog_it_no_reference");
    config.report.reference_players = vec!["Nobody".into()];
    let (_db, summary) = run(&config);
    assert_eq!(summary.exports.len(), 6);
    assert!(summary
        .exports
        .iter()
        .all(|p| !p.to_string_lossy().contains("slate_date_split")));
    let _ = std::fs::remove_dir_all(&config.export_dir);
}

#[test]
fn target_team_limits_slate() {
    let mut config = inline_config("hoopslog_it_target_team");
    config.report.target_team = Some("NYK".into());
    let (_db, summary) = run(&config);
    let current = Csv::read(&export_named(&summary, "slate_current_team"));
    assert_eq!(current.values("PLAYER"), vec!["Jalen Brunson"]);
    // materialized averages are unaffected
    assert_eq!(summary.averages_rows, 6);
    let _ = std::fs::remove_dir_all(&config.export_dir);
}

// ===========================================================================
// Defaults
// ===========================================================================

#[test]
fn default_config_is_valid_toml() {
    let content = std::fs::read_to_string("defaults/hoopslog.toml")
        .expect("defaults/hoopslog.toml should exist");
    let parsed: Result<toml::Value, _> = toml::from_str(&content);
    assert!(parsed.is_ok(), "defaults/hoopslog.toml is not valid TOML: {:?}", parsed.err());
}
