// Configuration loading and parsing (hoopslog.toml).

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use hoopslog_core::season::SeasonKey;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "hoopslog.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub tables: TableNames,
    pub export_dir: String,
    pub report: ReportConfig,
}

/// Names of the tables the pipeline reads and writes.
#[derive(Debug, Clone, Deserialize)]
pub struct TableNames {
    pub logs: String,
    pub players: String,
    pub teams: String,
    pub averages: String,
}

/// Report parameters with season keys and dates already parsed.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub window_size: usize,
    pub last_days: u32,
    /// Empty means every season.
    pub seasons: Vec<SeasonKey>,
    pub min_points_per_game: Option<f64>,
    pub reference_players: Vec<String>,
    pub target_team: Option<String>,
    /// Fixed end date for the last-days report; `None` means today.
    pub as_of: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// hoopslog.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire hoopslog.toml file.
#[derive(Debug, Clone, Deserialize)]
struct HoopslogFile {
    database: DatabaseSection,
    tables: TableNames,
    export: ExportSection,
    report: ReportSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ExportSection {
    dir: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ReportSection {
    window_size: usize,
    last_days: u32,
    #[serde(default)]
    seasons: Vec<String>,
    #[serde(default)]
    min_points_per_game: Option<f64>,
    #[serde(default)]
    reference_players: Vec<String>,
    #[serde(default)]
    target_team: Option<String>,
    #[serde(default)]
    as_of: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/hoopslog.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = std::fs::read_to_string(&path)
        .map_err(|_| ConfigError::FileNotFound { path: path.clone() })?;
    let file: HoopslogFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let report = assemble_report(file.report)?;
    let config = Config {
        db_path: file.database.path,
        tables: file.tables,
        export_dir: file.export.dir,
        report,
    };

    validate(&config)?;

    Ok(config)
}

fn assemble_report(section: ReportSection) -> Result<ReportConfig, ConfigError> {
    let seasons = section
        .seasons
        .iter()
        .map(|raw| {
            raw.parse::<SeasonKey>()
                .map_err(|e| ConfigError::ValidationError {
                    field: "report.seasons".into(),
                    message: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let as_of = section
        .as_of
        .as_deref()
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| ConfigError::ValidationError {
                field: "report.as_of".into(),
                message: format!("expected YYYY-MM-DD, got '{raw}': {e}"),
            })
        })
        .transpose()?;

    Ok(ReportConfig {
        window_size: section.window_size,
        last_days: section.last_days,
        seasons,
        min_points_per_game: section.min_points_per_game,
        reference_players: section.reference_players,
        target_team: section.target_team,
        as_of,
    })
}

/// Copy `defaults/hoopslog.toml` to `config/hoopslog.toml` unless the config
/// file already exists. Returns the written path, or `None` when an existing
/// file was kept.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.is_file() {
        return Ok(None);
    }
    let source = base_dir.join("defaults").join(CONFIG_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config/{CONFIG_FILE} and no defaults/{CONFIG_FILE} in {}; \
                 run from the directory holding defaults/",
                base_dir.display()
            ),
        });
    }
    let copy_err = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("copying {} to {}: {e}", source.display(), target.display()),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(copy_err)?;
    }
    std::fs::copy(&source, &target).map_err(copy_err)?;
    Ok(Some(target))
}

/// Load the config from the working directory, seeding it from the defaults
/// on first run.
pub fn load_config() -> Result<Config, ConfigError> {
    let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    ensure_config_file(&base)?;
    load_config_from(&base)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------



/// Table names end up inside SQL text, so only plain identifiers are allowed.
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    let t = &config.tables;
    let table_fields: &[(&str, &str)] = &[
        ("tables.logs", &t.logs),
        ("tables.players", &t.players),
        ("tables.teams", &t.teams),
        ("tables.averages", &t.averages),
    ];
    for (name, val) in table_fields {
        if !is_plain_identifier(val) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be a plain SQL identifier, got '{val}'"),
            });
        }
    }

    if config.export_dir.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "export.dir".into(),
            message: "must not be empty".into(),
        });
    }

    let report = &config.report;
    if report.window_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "report.window_size".into(),
            message: "must be greater than 0".into(),
        });
    }
    if report.last_days == 0 {
        return Err(ConfigError::ValidationError {
            field: "report.last_days".into(),
            message: "must be greater than 0".into(),
        });
    }
    if let Some(min) = report.min_points_per_game {
        if !min.is_finite() || min < 0.0 {
            return Err(ConfigError::ValidationError {
                field: "report.min_points_per_game".into(),
                message: format!("must be a non-negative number, got {min}"),
            });
        }
    }
    if report.target_team.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "report.target_team".into(),
            message: "must not be empty when set".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
