// Input records and reference tables supplied by the external log store.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Game log
// ---------------------------------------------------------------------------

/// Where a game was played, from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Road,
    Neutral,
}

impl Venue {
    /// Parse the single-letter venue code used by the log feed (`H`, `R`, `N`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "H" => Some(Venue::Home),
            "R" => Some(Venue::Road),
            "N" => Some(Venue::Neutral),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Venue::Home => "H",
            Venue::Road => "R",
            Venue::Neutral => "N",
        }
    }
}

/// Box-score counting stats for one player in one game. Every column is
/// nullable in the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxScore {
    pub pts: Option<f64>,
    pub reb: Option<f64>,
    pub ast: Option<f64>,
    pub stl: Option<f64>,
    pub blk: Option<f64>,
    pub tov: Option<f64>,
    pub pf: Option<f64>,
    pub fgm: Option<f64>,
    pub fga: Option<f64>,
    pub fg3m: Option<f64>,
    pub fg3a: Option<f64>,
    pub ftm: Option<f64>,
    pub fta: Option<f64>,
}

/// One row per player per game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameLogRecord {
    pub player_id: i64,
    pub game_id: String,
    pub date: NaiveDate,
    /// Free-text segment label, e.g. `"NBA 2023-2024 Regular Season"`.
    pub season_segment: String,
    /// Player name as written in the log. Reports name players only through
    /// [`PlayerDirectory`]; an id missing there reports as null.
    pub player: String,
    /// Raw team name, resolved through [`TeamNameMap`].
    pub team: String,
    pub opponent: String,
    pub venue: Option<Venue>,
    pub started: bool,
    pub minutes: Option<f64>,
    pub fantasy_points: Option<f64>,
    pub salary: Option<f64>,
    pub usage: Option<f64>,
    pub box_score: BoxScore,
}

// ---------------------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------------------

/// Player id to canonical display name.
#[derive(Debug, Clone, Default)]
pub struct PlayerDirectory {
    names: HashMap<i64, String>,
}

impl PlayerDirectory {
    pub fn name(&self, player_id: i64) -> Option<&str> {
        self.names.get(&player_id).map(String::as_str)
    }

    /// Every id registered under exactly this name, ascending.
    pub fn ids_named(&self, name: &str) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .names
            .iter()
            .filter(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(i64, String)> for PlayerDirectory {
    fn from_iter<T: IntoIterator<Item = (i64, String)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Raw team name as written by the log feed, paired with its abbreviation.
const STANDARD_TEAMS: [(&str, &str); 30] = [
    ("Atlanta", "ATL"),
    ("Boston", "BOS"),
    ("Brooklyn", "BKN"),
    ("Charlotte", "CHA"),
    ("Chicago", "CHI"),
    ("Cleveland", "CLE"),
    ("Dallas", "DAL"),
    ("Denver", "DEN"),
    ("Detroit", "DET"),
    ("Golden State", "GSW"),
    ("Houston", "HOU"),
    ("Indiana", "IND"),
    ("LA Clippers", "LAC"),
    ("LA Lakers", "LAL"),
    ("Memphis", "MEM"),
    ("Miami", "MIA"),
    ("Milwaukee", "MIL"),
    ("Minnesota", "MIN"),
    ("New Orleans", "NOP"),
    ("New York", "NYK"),
    ("Oklahoma City", "OKC"),
    ("Orlando", "ORL"),
    ("Philadelphia", "PHI"),
    ("Phoenix", "PHX"),
    ("Portland", "POR"),
    ("Sacramento", "SAC"),
    ("San Antonio", "SAS"),
    ("Toronto", "TOR"),
    ("Utah", "UTA"),
    ("Washington", "WAS"),
];

/// Raw team name to short abbreviation code.
#[derive(Debug, Clone, Default)]
pub struct TeamNameMap {
    abbreviations: HashMap<String, String>,
}

impl TeamNameMap {
    /// The fixed 30-team list used by the log feed.
    pub fn standard() -> Self {
        STANDARD_TEAMS
            .iter()
            .map(|(raw, abbr)| (raw.to_string(), abbr.to_string()))
            .collect()
    }

    pub fn abbreviation(&self, raw_name: &str) -> Option<&str> {
        self.abbreviations.get(raw_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.abbreviations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abbreviations.is_empty()
    }
}

impl FromIterator<(String, String)> for TeamNameMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            abbreviations: iter.into_iter().collect(),
        }
    }
}

/// Immutable snapshot of the three inputs every report reads from.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub logs: Vec<GameLogRecord>,
    pub players: PlayerDirectory,
    pub teams: TeamNameMap,
}

impl Dataset {
    pub fn new(logs: Vec<GameLogRecord>, players: PlayerDirectory, teams: TeamNameMap) -> Self {
        Self {
            logs,
            players,
            teams,
        }
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_team_map_has_thirty_unique_codes() {
        let map = TeamNameMap::standard();
        assert_eq!(map.len(), 30);
        let codes: std::collections::HashSet<_> =
            STANDARD_TEAMS.iter().map(|(_, abbr)| *abbr).collect();
        assert_eq!(codes.len(), 30);
        assert_eq!(map.abbreviation("LA Lakers"), Some("LAL"));
        assert_eq!(map.abbreviation("Seattle"), None);
    }

    #[test]
    fn venue_codes() {
        assert_eq!(Venue::from_code("h"), Some(Venue::Home));
        assert_eq!(Venue::from_code(" R "), Some(Venue::Road));
        assert_eq!(Venue::from_code("N"), Some(Venue::Neutral));
        assert_eq!(Venue::from_code("X"), None);
        assert_eq!(Venue::Road.code(), "R");
    }

    #[test]
    fn directory_lookup() {
        let dir: PlayerDirectory = vec![
            (1, "Nikola Jokic".to_string()),
            (7, "Marcus Morris".to_string()),
            (5, "Marcus Morris".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(dir.name(1), Some("Nikola Jokic"));
        assert_eq!(dir.name(2), None);
        assert_eq!(dir.ids_named("Marcus Morris"), vec![5, 7]);
        assert!(dir.ids_named("nikola jokic").is_empty());
    }
}
