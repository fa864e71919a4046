// The summary pipeline: verify the store, load a snapshot, materialize the
// season-averages table and views, then export the CSV reports.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use hoopslog_core::model::Dataset;
use hoopslog_core::present::{display_rows, sort_for_slate, split_display_rows, DisplayRow, SplitDisplayRow};
use hoopslog_core::report::{season_type_view, ReportEngine, ReportParams};
use hoopslog_core::season::SeasonType;
use hoopslog_core::split::HavingFilter;
use tracing::{info, warn};

use crate::config::{Config, ReportConfig};
use crate::db::Database;
use crate::export::{export_csv, run_stamp};

/// What a pipeline run produced.
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    /// Rows written to the averages table.
    pub averages_rows: usize,
    /// Log rows excluded for an unrecognized season label.
    pub unrecognized_rows: usize,
    /// Exported CSV files, in write order.
    pub exports: Vec<PathBuf>,
}

/// Run against the configured database, stamping exports with the local time.
pub fn run_summary_pipeline(config: &Config) -> Result<PipelineSummary> {
    let db = Database::open(&config.db_path)?;
    run_with_database(&db, config, Local::now().naive_local())
}

pub fn run_with_database(db: &Database, config: &Config, now: NaiveDateTime) -> Result<PipelineSummary> {
    db.verify_tables(&config.tables)?;
    let dataset = db
        .load_dataset(&config.tables)
        .context("failed to load dataset")?;
    let engine = ReportEngine::new(&dataset);
    let unrecognized_rows = engine.unrecognized_segments().values().sum();

    // --- season averages, materialized ---
    let all = engine.season_averages(&ReportParams::new(config.report.window_size));
    let averages_rows = db.write_averages(&config.tables.averages, &display_rows(&all))?;
    db.create_convenience_views(&config.tables.averages)?;

    let stamp = run_stamp(now);
    let dir = Path::new(&config.export_dir);
    let mut exports = Vec::new();

    for (base, season_type) in [
        ("player_averages_regular_season", SeasonType::Regular),
        ("player_averages_playoffs", SeasonType::Playoffs),
    ] {
        let rows = display_rows(&season_type_view(&all, season_type));
        exports.push(export_csv(dir, base, &stamp, &rows, &DisplayRow::COLUMNS)?);
    }

    // --- slate reports ---
    let report = &config.report;
    let params = slate_params(report, &dataset);

    let mut current = display_rows(&engine.current_team_averages(&params));
    sort_for_slate(&mut current);
    exports.push(export_csv(dir, "slate_current_team", &stamp, &current, &DisplayRow::COLUMNS)?);

    let mut last_n = display_rows(&engine.last_n_games(&params));
    sort_for_slate(&mut last_n);
    let base = format!("slate_last_{}_games", report.window_size);
    exports.push(export_csv(dir, &base, &stamp, &last_n, &DisplayRow::COLUMNS)?);

    let as_of = report.as_of.unwrap_or_else(|| now.date());
    let mut recent = display_rows(&engine.last_days(&params, as_of, report.last_days));
    sort_for_slate(&mut recent);
    let base = format!("slate_last_{}_days", report.last_days);
    exports.push(export_csv(dir, &base, &stamp, &recent, &DisplayRow::COLUMNS)?);

    let venue = split_display_rows(&engine.venue_split(&params));
    exports.push(export_csv(dir, "slate_venue_split", &stamp, &venue, &SplitDisplayRow::COLUMNS)?);

    if let Some(params) = reference_params(params, report, &dataset) {
        let split = split_display_rows(&engine.date_split(&params)?);
        exports.push(export_csv(dir, "slate_date_split", &stamp, &split, &SplitDisplayRow::COLUMNS)?);
    }

    info!(
        "pipeline finished: {} averages rows, {} files exported",
        averages_rows,
        exports.len()
    );
    Ok(PipelineSummary {
        averages_rows,
        unrecognized_rows,
        exports,
    })
}

/// Regular-season parameters for the slate reports.
fn slate_params(report: &ReportConfig, dataset: &Dataset) -> ReportParams {
    let mut params = ReportParams::new(report.window_size)
        .with_season_type(SeasonType::Regular)
        .with_having(HavingFilter {
            min_points_per_game: report.min_points_per_game,
        });
    if !report.seasons.is_empty() {
        params = params.with_seasons(report.seasons.iter().copied());
    }
    if let Some(team) = &report.target_team {
        if !has_abbreviation(dataset, team) {
            warn!("target team '{}' matches no mapped abbreviation", team);
        }
        params = params.with_team(team.clone());
    }
    params
}

fn has_abbreviation(dataset: &Dataset, abbreviation: &str) -> bool {
    dataset
        .logs
        .iter()
        .any(|r| dataset.teams.abbreviation(&r.team) == Some(abbreviation))
}

/// Resolve configured reference player names to ids. `None` skips the date
/// split.
fn reference_params(params: ReportParams, report: &ReportConfig, dataset: &Dataset) -> Option<ReportParams> {
    if report.reference_players.is_empty() {
        return None;
    }
    let mut ids = Vec::new();
    for name in &report.reference_players {
        let found = dataset.players.ids_named(name);
        if found.is_empty() {
            warn!("reference player '{}' not found in the player directory", name);
        }
        ids.extend(found);
    }
    if ids.is_empty() {
        warn!("no reference players resolved; skipping date split");
        return None;
    }
    Some(params.with_reference_group(ids))
}
