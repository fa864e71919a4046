// CSV export of report rows.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Timestamp suffix of exported file names, e.g. `03-14-2025_071502`.
pub const STAMP_FORMAT: &str = "%m-%d-%Y_%H%M%S";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

pub fn run_stamp(at: NaiveDateTime) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// `<base>_<stamp>.csv`
pub fn stamped_file_name(base: &str, stamp: &str) -> String {
    format!("{base}_{stamp}.csv")
}

/// Serialize `rows` with a header taken from the row type's field names.
/// Empty `rows` still produce the header when `header` is given.
pub fn write_rows<W, T>(writer: W, rows: &[T], header: Option<&[&str]>) -> Result<(), csv::Error>
where
    W: io::Write,
    T: Serialize,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!rows.is_empty())
        .from_writer(writer);
    if rows.is_empty() {
        if let Some(columns) = header {
            wtr.write_record(columns)?;
        }
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `rows` to `<dir>/<base>_<stamp>.csv`, creating `dir` if needed.
pub fn export_csv<T: Serialize>(
    dir: &Path,
    base: &str,
    stamp: &str,
    rows: &[T],
    header: &[&str],
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(stamped_file_name(base, stamp));
    let file = std::fs::File::create(&path).map_err(|e| ExportError::Csv {
        path: path.clone(),
        source: e.into(),
    })?;
    write_rows(io::BufWriter::new(file), rows, Some(header)).map_err(|source| ExportError::Csv {
        path: path.clone(),
        source,
    })?;
    info!("exported {} rows to {}", rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    struct Sample {
        player: Option<String>,
        fppg: Option<f64>,
        gp: u32,
    }

    fn render(rows: &[Sample], header: Option<&[&str]>) -> String {
        let mut buf = Vec::new();
        write_rows(&mut buf, rows, header).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn nulls_render_as_empty_fields() {
        let rows = vec![
            Sample {
                player: Some("Nikola Jokic".into()),
                fppg: Some(61.25),
                gp: 70,
            },
            Sample {
                player: None,
                fppg: None,
                gp: 1,
            },
        ];
        assert_eq!(
            render(&rows, None),
            "PLAYER,FPPG,GP\nNikola Jokic,61.25,70\n,,1\n"
        );
    }

    #[test]
    fn empty_rows_keep_header() {
        assert_eq!(render(&[], Some(&["PLAYER", "FPPG", "GP"])), "PLAYER,FPPG,GP\n");
        assert_eq!(render(&[], None), "");
    }

    #[test]
    fn stamp_format() {
        let at = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(7, 15, 2)
            .unwrap();
        let stamp = run_stamp(at);
        assert_eq!(stamp, "03-14-2025_071502");
        assert_eq!(
            stamped_file_name("player_averages_playoffs", &stamp),
            "player_averages_playoffs_03-14-2025_071502.csv"
        );
    }

    #[test]
    fn export_creates_directory() {
        let dir = std::env::temp_dir().join("hoopslog_export_test");
        let _ = std::fs::remove_dir_all(&dir);
        let rows = vec![Sample {
            player: Some("Jamal Murray".into()),
            fppg: Some(35.5),
            gp: 60,
        }];
        let path = export_csv(&dir, "sample", "01-01-2025_000000", &rows, &["PLAYER", "FPPG", "GP"]).unwrap();
        assert!(path.ends_with("sample_01-01-2025_000000.csv"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("PLAYER,FPPG,GP\n"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
