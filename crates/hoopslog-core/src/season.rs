// Season-segment classification and canonical season keys.
//
// Labels look like "NBA 2023-2024 Regular Season", "NBA 2023 In-Season
// Tournament" or "NBA 2024 Playoffs". They are tokenized rather than sliced by
// position, so a label in an unexpected shape is rejected instead of yielding
// a wrong key.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

use crate::model::GameLogRecord;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A parsed season-segment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeasonSegment {
    RegularSeason { year: u16 },
    InSeasonTournament { year: u16 },
    Playoffs { year: u16 },
    PlayIn { year: u16 },
    Unrecognized,
}

/// Regular-season family vs playoff family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SeasonType {
    Regular,
    Playoffs,
}

impl SeasonType {
    pub fn label(&self) -> &'static str {
        match self {
            SeasonType::Regular => "Regular",
            SeasonType::Playoffs => "Playoffs",
        }
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical season key: `"2023-24"` for a regular season spanning two
/// calendar years, `"2024"` for a playoff year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeasonKey {
    Season { start_year: u16 },
    Year(u16),
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonKey::Season { start_year } => {
                write!(f, "{}-{:02}", start_year, (start_year + 1) % 100)
            }
            SeasonKey::Year(year) => write!(f, "{year}"),
        }
    }
}

impl Serialize for SeasonKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeasonKeyError {
    #[error("season key `{0}` is not `YYYY` or `YYYY-YY`")]
    Format(String),

    #[error("season key `{key}` should end in `{expected:02}`")]
    EndYear { key: String, expected: u16 },
}

impl FromStr for SeasonKey {
    type Err = SeasonKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let format_err = || SeasonKeyError::Format(s.to_string());
        let (start, end) = match s.split_once('-') {
            Some((start, end)) => (start, Some(end)),
            None => (s, None),
        };
        if !is_digits(start, 4) {
            return Err(format_err());
        }
        let start_year: u16 = start.parse().map_err(|_| format_err())?;
        match end {
            None => Ok(SeasonKey::Year(start_year)),
            Some(end) => {
                if !is_digits(end, 2) {
                    return Err(format_err());
                }
                let expected = (start_year + 1) % 100;
                let got: u16 = end.parse().map_err(|_| format_err())?;
                if got != expected {
                    return Err(SeasonKeyError::EndYear {
                        key: s.to_string(),
                        expected,
                    });
                }
                Ok(SeasonKey::Season { start_year })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Label parsing
// ---------------------------------------------------------------------------

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// Find the first standalone 4-digit year in `label`. A following `-YYYY` or
/// `-YY` must name the next year; any other suffix makes the label malformed.
fn find_year(label: &str) -> Option<u16> {
    let bytes = label.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i - start != 4 {
            continue;
        }
        let year: u16 = label[start..i].parse().ok()?;
        if bytes.get(i) == Some(&b'-') {
            let rest = &label[i + 1..];
            let run = rest.bytes().take_while(u8::is_ascii_digit).count();
            let next = year + 1;
            let ok = match run {
                0 => true,
                2 => rest[..2].parse::<u16>().ok() == Some(next % 100),
                4 => rest[..4].parse::<u16>().ok() == Some(next),
                _ => false,
            };
            if !ok {
                return None;
            }
        }
        return Some(year);
    }
    None
}

impl SeasonSegment {
    /// Classify a free-text season-segment label.
    pub fn parse(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        let Some(year) = find_year(label) else {
            return SeasonSegment::Unrecognized;
        };
        if lower.contains("regular season") {
            SeasonSegment::RegularSeason { year }
        } else if lower.contains("in-season tournament") {
            SeasonSegment::InSeasonTournament { year }
        } else if lower.contains("playoffs") {
            SeasonSegment::Playoffs { year }
        } else if lower.contains("play-in") {
            SeasonSegment::PlayIn { year }
        } else {
            SeasonSegment::Unrecognized
        }
    }

    pub fn season_type(&self) -> Option<SeasonType> {
        match self {
            SeasonSegment::RegularSeason { .. } | SeasonSegment::InSeasonTournament { .. } => {
                Some(SeasonType::Regular)
            }
            SeasonSegment::Playoffs { .. } | SeasonSegment::PlayIn { .. } => {
                Some(SeasonType::Playoffs)
            }
            SeasonSegment::Unrecognized => None,
        }
    }

    /// Regular-season and tournament games share the `YYYY-YY` key of the
    /// season they belong to; playoff and play-in games use the bare year.
    pub fn season_key(&self) -> Option<SeasonKey> {
        match *self {
            SeasonSegment::RegularSeason { year } | SeasonSegment::InSeasonTournament { year } => {
                Some(SeasonKey::Season { start_year: year })
            }
            SeasonSegment::Playoffs { year } | SeasonSegment::PlayIn { year } => {
                Some(SeasonKey::Year(year))
            }
            SeasonSegment::Unrecognized => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization over a record set
// ---------------------------------------------------------------------------

/// A log record with its season classification attached.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedRecord<'a> {
    pub record: &'a GameLogRecord,
    pub season_type: SeasonType,
    pub season: SeasonKey,
}

/// Result of normalizing a batch of records.
#[derive(Debug, Default)]
pub struct NormalizedLogs<'a> {
    pub rows: Vec<NormalizedRecord<'a>>,
    /// Distinct labels that could not be classified, with their row counts.
    pub unrecognized: BTreeMap<String, usize>,
}

/// Attach season type and key to every record, setting aside rows whose label
/// does not classify. Each distinct bad label is logged once.
pub fn normalize<'a, I>(records: I) -> NormalizedLogs<'a>
where
    I: IntoIterator<Item = &'a GameLogRecord>,
{
    let mut out = NormalizedLogs::default();
    for record in records {
        let segment = SeasonSegment::parse(&record.season_segment);
        match (segment.season_type(), segment.season_key()) {
            (Some(season_type), Some(season)) => out.rows.push(NormalizedRecord {
                record,
                season_type,
                season,
            }),
            _ => *out.unrecognized.entry(record.season_segment.clone()).or_insert(0) += 1,
        }
    }
    for (label, count) in &out.unrecognized {
        warn!("excluding {} log rows with unrecognized season segment '{}'", count, label);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    fn key(label: &str) -> Option<String> {
        SeasonSegment::parse(label).season_key().map(|k| k.to_string())
    }

    #[test]
    fn regular_season_label() {
        assert_eq!(
            SeasonSegment::parse("NBA 2023-2024 Regular Season"),
            SeasonSegment::RegularSeason { year: 2023 }
        );
        assert_eq!(key("NBA 2023-2024 Regular Season").as_deref(), Some("2023-24"));
    }

    #[test]
    fn in_season_tournament_shares_regular_key() {
        assert_eq!(key("NBA 2023 In-Season Tournament").as_deref(), Some("2023-24"));
        assert_eq!(
            SeasonSegment::parse("NBA 2023 In-Season Tournament").season_type(),
            Some(SeasonType::Regular)
        );
    }

    #[test]
    fn century_rollover_is_zero_padded() {
        assert_eq!(key("NBA 1999-2000 Regular Season").as_deref(), Some("1999-00"));
        assert_eq!(key("NBA 2008-2009 Regular Season").as_deref(), Some("2008-09"));
    }

    #[test]
    fn regular_keys_match_pattern() {
        for year in 1990..2040u16 {
            let label = format!("NBA {}-{} Regular Season", year, year + 1);
            let k = key(&label).unwrap();
            let (start, end) = k.split_once('-').unwrap();
            assert!(is_digits(start, 4) && is_digits(end, 2), "{k}");
            assert_eq!(start.parse::<u16>().unwrap(), year);
            assert_eq!(end.parse::<u16>().unwrap(), (year + 1) % 100);
        }
    }

    #[test]
    fn playoff_family_uses_bare_year() {
        assert_eq!(key("NBA 2024 Playoffs").as_deref(), Some("2024"));
        assert_eq!(key("NBA 2024 Play-In").as_deref(), Some("2024"));
        assert_eq!(
            SeasonSegment::parse("NBA 2024 Play-In"),
            SeasonSegment::PlayIn { year: 2024 }
        );
        assert_eq!(
            SeasonSegment::parse("NBA 2024 Playoffs").season_type(),
            Some(SeasonType::Playoffs)
        );
    }

    #[test]
    fn unrecognized_labels() {
        assert_eq!(SeasonSegment::parse("NBA 2024 Summer League"), SeasonSegment::Unrecognized);
        assert_eq!(SeasonSegment::parse("Regular Season"), SeasonSegment::Unrecognized);
        assert_eq!(SeasonSegment::parse(""), SeasonSegment::Unrecognized);
        // mismatched span
        assert_eq!(
            SeasonSegment::parse("NBA 2023-2025 Regular Season"),
            SeasonSegment::Unrecognized
        );
        // five-digit run is not a year
        assert_eq!(
            SeasonSegment::parse("NBA 20233 Regular Season"),
            SeasonSegment::Unrecognized
        );
    }

    #[test]
    fn short_span_suffix_accepted() {
        assert_eq!(key("NBA 2023-24 Regular Season").as_deref(), Some("2023-24"));
    }

    #[test]
    fn season_key_from_str() {
        assert_eq!("2023-24".parse(), Ok(SeasonKey::Season { start_year: 2023 }));
        assert_eq!("2024".parse(), Ok(SeasonKey::Year(2024)));
        assert_eq!("1999-00".parse(), Ok(SeasonKey::Season { start_year: 1999 }));
        assert!(matches!(
            "2023-25".parse::<SeasonKey>(),
            Err(SeasonKeyError::EndYear { expected: 24, .. })
        ));
        assert!(matches!("23-24".parse::<SeasonKey>(), Err(SeasonKeyError::Format(_))));
        assert!(matches!("season".parse::<SeasonKey>(), Err(SeasonKeyError::Format(_))));
    }

    #[test]
    fn normalize_sets_aside_bad_labels() {
        let mut good = fixtures::log(1, "2024-01-10", "Denver", true, 30.0, 40.0);
        good.season_segment = "NBA 2023-2024 Regular Season".into();
        let mut playoff = fixtures::log(1, "2024-04-25", "Denver", true, 36.0, 50.0);
        playoff.season_segment = "NBA 2024 Playoffs".into();
        let mut bad = fixtures::log(1, "2024-07-10", "Denver", true, 20.0, 10.0);
        bad.season_segment = "NBA 2024 Summer League".into();
        let bad_too = bad.clone();

        let records = vec![good, playoff, bad, bad_too];
        let normalized = normalize(&records);
        assert_eq!(normalized.rows.len(), 2);
        assert_eq!(normalized.rows[0].season, SeasonKey::Season { start_year: 2023 });
        assert_eq!(normalized.rows[1].season, SeasonKey::Year(2024));
        assert_eq!(normalized.rows[1].season_type, SeasonType::Playoffs);
        assert_eq!(normalized.unrecognized.get("NBA 2024 Summer League"), Some(&2));
    }
}
