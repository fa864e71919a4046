// SQLite access for the game-log store: loading inputs and materializing the
// season-averages table and its views.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use hoopslog_core::model::{BoxScore, Dataset, GameLogRecord, PlayerDirectory, TeamNameMap, Venue};
use hoopslog_core::present::DisplayRow;
use hoopslog_core::season::SeasonType;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};
use tracing::{debug, info, warn};

use crate::config::TableNames;

pub const REGULAR_SEASON_VIEW: &str = "vw_player_averages_regular_season";
pub const PLAYOFFS_VIEW: &str = "vw_player_averages_playoffs";

/// Columns read from the logs table, in select order. Required columns must
/// exist; missing optional columns read as NULL.
const LOG_COLUMNS: &[(&str, bool)] = &[
    ("PLAYER_ID", true),
    ("GAME_ID", false),
    ("DATE", true),
    ("SEASON_SEGMENT", true),
    ("PLAYER", false),
    ("TEAM", true),
    ("OPPONENT", false),
    ("VENUE", false),
    ("STARTED", false),
    ("MINUTES", false),
    ("DK_POINTS", false),
    ("DK_SALARY", false),
    ("USAGE", false),
    ("PTS", false),
    ("TREB", false),
    ("AST", false),
    ("STL", false),
    ("BLK", false),
    ("TOV", false),
    ("PF", false),
    ("FG", false),
    ("FGA", false),
    ("3P", false),
    ("3PA", false),
    ("FT", false),
    ("FTA", false),
];

/// Schema of the materialized averages table, matching [`DisplayRow`].
const AVERAGES_COLUMNS: &[(&str, &str)] = &[
    ("SEASON_TYPE", "TEXT NOT NULL"),
    ("PLAYER_ID", "INTEGER NOT NULL"),
    ("PLAYER", "TEXT"),
    ("SEASON", "TEXT NOT NULL"),
    ("TEAM", "TEXT"),
    ("GP", "INTEGER NOT NULL"),
    ("GS", "INTEGER NOT NULL"),
    ("SALPG", "INTEGER"),
    ("FPPG", "REAL"),
    ("STDV_FPPG", "REAL"),
    ("MPG", "REAL"),
    ("STDV_MPG", "REAL"),
    ("FPPM", "REAL NOT NULL"),
    ("STDV_FPPM", "REAL"),
    ("USG", "REAL"),
    ("GSFPPG", "REAL NOT NULL"),
    ("STDV_GSFPPG", "REAL"),
    ("GSMPG", "REAL NOT NULL"),
    ("STDV_GSMPG", "REAL"),
    ("GSFPPM", "REAL NOT NULL"),
    ("STDV_GSFPPM", "REAL"),
    ("PTS", "REAL"),
    ("REB", "REAL"),
    ("AST", "REAL"),
    ("STL", "REAL"),
    ("BLK", "REAL"),
    ("TOV", "REAL"),
];

/// Read and write access to the game-log database.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open a SQLite database at `path`. The log store is owned by the
    /// ingestion jobs, so no schema is created here. Pass `":memory:"` for an
    /// ephemeral database (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .context("failed to set database pragmas")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Run a batch of SQL statements as-is.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn()
            .execute_batch(sql)
            .context("failed to execute SQL batch")
    }

    // ------------------------------------------------------------------
    // Schema checks
    // ------------------------------------------------------------------

    /// The subset of `names` that are neither tables nor views.
    pub fn missing_tables(&self, names: &[&str]) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'view')")
            .context("failed to prepare schema query")?;
        let existing: HashSet<String> = stmt
            .query_map([], |row| row.get(0))
            .context("failed to query schema")?
            .collect::<std::result::Result<_, _>>()
            .context("failed to read schema rows")?;
        Ok(names
            .iter()
            .filter(|&&n| !existing.contains(n))
            .map(|n| n.to_string())
            .collect())
    }

    /// Fail with a message naming every required table that is absent.
    pub fn verify_tables(&self, tables: &TableNames) -> Result<()> {
        let missing = self.missing_tables(&[
            tables.logs.as_str(),
            tables.teams.as_str(),
            tables.players.as_str(),
        ])?;
        if !missing.is_empty() {
            bail!(
                "required tables missing: {}; run the ingestion jobs first",
                missing.join(", ")
            );
        }
        Ok(())
    }

    fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
            .with_context(|| format!("failed to inspect table {table}"))?;
        let columns: HashSet<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .with_context(|| format!("failed to read columns of {table}"))?
            .collect::<std::result::Result<_, _>>()
            .with_context(|| format!("failed to read columns of {table}"))?;
        Ok(columns)
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load every game-log row. Rows without a usable player id or date are
    /// skipped with a warning.
    pub fn load_game_logs(&self, table: &str) -> Result<Vec<GameLogRecord>> {
        let conn = self.conn();
        let present = Self::table_columns(&conn, table)?;

        let mut select = Vec::with_capacity(LOG_COLUMNS.len());
        for &(column, required) in LOG_COLUMNS {
            if present.contains(column) {
                select.push(quote_ident(column));
            } else if required {
                bail!("table {table} has no {column} column");
            } else {
                debug!("{table}.{column} absent; reading as NULL");
                select.push("NULL".to_string());
            }
        }
        let sql = format!("SELECT {} FROM {}", select.join(", "), quote_ident(table));

        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare game log query")?;
        let rows = stmt
            .query_map([], |row| Ok(log_from_row(row)))
            .context("failed to query game logs")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map game log rows")?;

        let mut logs = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for (i, row) in rows.into_iter().enumerate() {
            match row {
                Ok(record) => logs.push(record),
                Err(reason) => {
                    skipped += 1;
                    warn!("skipping log row {}: {}", i + 1, reason);
                }
            }
        }
        info!("loaded {} game logs from {} ({} skipped)", logs.len(), table, skipped);
        Ok(logs)
    }

    pub fn load_player_directory(&self, table: &str) -> Result<PlayerDirectory> {
        let conn = self.conn();
        let sql = format!(
            "SELECT PLAYER_ID, PLAYER_NAME FROM {} WHERE PLAYER_ID IS NOT NULL AND PLAYER_NAME IS NOT NULL",
            quote_ident(table)
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare player directory query")?;
        let directory: PlayerDirectory = stmt
            .query_map([], |row| {
                Ok((value_i64(row.get_ref(0)?), value_text(row.get_ref(1)?)))
            })
            .context("failed to query player directory")?
            .filter_map(|r| match r {
                Ok((Some(id), Some(name))) => Some(Ok((id, name))),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<std::result::Result<_, _>>()
            .context("failed to map player directory rows")?;
        debug!("loaded {} players from {}", directory.len(), table);
        Ok(directory)
    }

    pub fn load_team_map(&self, table: &str) -> Result<TeamNameMap> {
        let conn = self.conn();
        let sql = format!(
            "SELECT RAW_TEAM_NAME, TEAM_ABBREVIATION FROM {}
             WHERE RAW_TEAM_NAME IS NOT NULL AND TEAM_ABBREVIATION IS NOT NULL",
            quote_ident(table)
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare team map query")?;
        let teams: TeamNameMap = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .context("failed to query team map")?
            .collect::<std::result::Result<_, _>>()
            .context("failed to map team rows")?;
        debug!("loaded {} team mappings from {}", teams.len(), table);
        Ok(teams)
    }

    /// Snapshot the logs and both reference tables.
    pub fn load_dataset(&self, tables: &TableNames) -> Result<Dataset> {
        let logs = self.load_game_logs(&tables.logs)?;
        let teams = self.load_team_map(&tables.teams)?;
        let players = self.load_player_directory(&tables.players)?;
        info!(
            "loaded {} logs, {} team mappings and {} players",
            logs.len(),
            teams.len(),
            players.len()
        );
        Ok(Dataset::new(logs, players, teams))
    }

    // ------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------

    /// Replace `table` with `rows` in a single transaction.
    pub fn write_averages(&self, table: &str, rows: &[DisplayRow]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin averages transaction")?;

        let quoted = quote_ident(table);
        let columns: Vec<String> = AVERAGES_COLUMNS
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_ident(name), ty))
            .collect();
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {quoted};
             CREATE TABLE {quoted} ({});",
            columns.join(", ")
        ))
        .with_context(|| format!("failed to recreate {table}"))?;

        let placeholders: Vec<String> = (1..=AVERAGES_COLUMNS.len()).map(|i| format!("?{i}")).collect();
        let insert = format!(
            "INSERT INTO {quoted} VALUES ({})",
            placeholders.join(", ")
        );
        {
            let mut stmt = tx
                .prepare(&insert)
                .context("failed to prepare averages insert")?;
            for r in rows {
                stmt.execute(params![
                    r.season_type.label(),
                    r.player_id,
                    r.player,
                    r.season.to_string(),
                    r.team,
                    r.gp,
                    r.gs,
                    r.salpg,
                    r.fppg,
                    r.stdv_fppg,
                    r.mpg,
                    r.stdv_mpg,
                    r.fppm,
                    r.stdv_fppm,
                    r.usg,
                    r.gsfppg,
                    r.stdv_gsfppg,
                    r.gsmpg,
                    r.stdv_gsmpg,
                    r.gsfppm,
                    r.stdv_gsfppm,
                    r.pts,
                    r.reb,
                    r.ast,
                    r.stl,
                    r.blk,
                    r.tov,
                ])
                .context("failed to insert averages row")?;
            }
        }

        tx.commit().context("failed to commit averages")?;
        info!("wrote {} rows to {}", rows.len(), table);
        Ok(rows.len())
    }

    /// (Re)create the regular-season and playoff views over `averages_table`.
    pub fn create_convenience_views(&self, averages_table: &str) -> Result<()> {
        let quoted = quote_ident(averages_table);
        let mut sql = String::new();
        for (view, season_type) in [
            (REGULAR_SEASON_VIEW, SeasonType::Regular),
            (PLAYOFFS_VIEW, SeasonType::Playoffs),
        ] {
            sql.push_str(&format!(
                "DROP VIEW IF EXISTS {view};
                 CREATE VIEW {view} AS SELECT * FROM {quoted} WHERE SEASON_TYPE = '{}';\n",
                season_type.label()
            ));
        }
        self.execute_batch(&sql)
            .context("failed to create convenience views")?;
        debug!("views created over {}", averages_table);
        Ok(())
    }

    /// Row count of a table or view.
    pub fn row_count(&self, name: &str) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(name)), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("failed to count rows of {name}"))?;
        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Numbers may arrive as INTEGER, REAL or numeric TEXT depending on how the
/// ingestion job typed the column.
fn value_f64(v: ValueRef<'_>) -> Option<f64> {
    match v {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) if f.is_finite() => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        _ => None,
    }
}

fn value_i64(v: ValueRef<'_>) -> Option<i64> {
    match v {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        _ => None,
    }
}

fn value_text(v: ValueRef<'_>) -> Option<String> {
    match v {
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        _ => None,
    }
}

/// `YYYY-MM-DD`, tolerating a trailing time part.
fn parse_log_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Decode one logs row in [`LOG_COLUMNS`] order. The error names why the
/// row is unusable.
fn log_from_row(row: &Row<'_>) -> std::result::Result<GameLogRecord, String> {
    let get = |i: usize| row.get_ref(i).unwrap_or(ValueRef::Null);
    let num = |i: usize| value_f64(get(i));
    let text = |i: usize| value_text(get(i));

    let player_id = value_i64(get(0)).ok_or("missing PLAYER_ID")?;
    let raw_date = text(2).ok_or("missing DATE")?;
    let date = parse_log_date(&raw_date).ok_or_else(|| format!("bad DATE '{raw_date}'"))?;
    let season_segment = text(3).ok_or("missing SEASON_SEGMENT")?;
    let team = text(5).ok_or("missing TEAM")?;

    Ok(GameLogRecord {
        player_id,
        game_id: text(1).unwrap_or_default(),
        date,
        season_segment,
        player: text(4).unwrap_or_default(),
        team,
        opponent: text(6).unwrap_or_default(),
        venue: text(7).as_deref().and_then(Venue::from_code),
        started: text(8).is_some_and(|s| s.trim().eq_ignore_ascii_case("Y")),
        minutes: num(9),
        fantasy_points: num(10),
        salary: num(11),
        usage: num(12),
        box_score: BoxScore {
            pts: num(13),
            reb: num(14),
            ast: num(15),
            stl: num(16),
            blk: num(17),
            tov: num(18),
            pf: num(19),
            fgm: num(20),
            fga: num(21),
            fg3m: num(22),
            fg3a: num(23),
            ftm: num(24),
            fta: num(25),
        },
    })
}
