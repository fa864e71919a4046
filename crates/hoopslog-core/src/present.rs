// Presentation rows: fixed display precision and upper-case column names.
//
// Aggregation keeps full precision; rounding happens only here.

use serde::Serialize;

use crate::report::{AggregateRow, PartitionRow};
use crate::season::{SeasonKey, SeasonType};

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn round_opt(value: Option<f64>, places: i32) -> Option<f64> {
    value.map(|v| round_to(v, places))
}

/// A report row ready for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DisplayRow {
    pub season_type: SeasonType,
    pub player_id: i64,
    pub player: Option<String>,
    pub season: SeasonKey,
    pub team: Option<String>,
    pub gp: u32,
    pub gs: u32,
    pub salpg: Option<i64>,
    pub fppg: Option<f64>,
    pub stdv_fppg: Option<f64>,
    pub mpg: Option<f64>,
    pub stdv_mpg: Option<f64>,
    pub fppm: f64,
    pub stdv_fppm: Option<f64>,
    pub usg: Option<f64>,
    pub gsfppg: f64,
    pub stdv_gsfppg: Option<f64>,
    pub gsmpg: f64,
    pub stdv_gsmpg: Option<f64>,
    pub gsfppm: f64,
    pub stdv_gsfppm: Option<f64>,
    pub pts: Option<f64>,
    pub reb: Option<f64>,
    pub ast: Option<f64>,
    pub stl: Option<f64>,
    pub blk: Option<f64>,
    pub tov: Option<f64>,
}

impl DisplayRow {
    /// Header names in serialization order.
    pub const COLUMNS: [&'static str; 27] = [
        "SEASON_TYPE", "PLAYER_ID", "PLAYER", "SEASON", "TEAM", "GP", "GS", "SALPG", "FPPG",
        "STDV_FPPG", "MPG", "STDV_MPG", "FPPM", "STDV_FPPM", "USG", "GSFPPG", "STDV_GSFPPG",
        "GSMPG", "STDV_GSMPG", "GSFPPM", "STDV_GSFPPM", "PTS", "REB", "AST", "STL", "BLK",
        "TOV",
    ];
}

impl From<&AggregateRow> for DisplayRow {
    fn from(row: &AggregateRow) -> Self {
        let a = &row.averages;
        let b = &a.box_score;
        DisplayRow {
            season_type: row.season_type,
            player_id: row.player_id,
            player: row.player.clone(),
            season: row.season,
            team: row.team.clone(),
            gp: a.gp,
            gs: a.gs,
            salpg: a.salpg.map(|v| v.round() as i64),
            fppg: round_opt(a.fppg, 2),
            stdv_fppg: round_opt(a.stdv_fppg, 2),
            mpg: round_opt(a.mpg, 1),
            stdv_mpg: round_opt(a.stdv_mpg, 2),
            fppm: round_to(a.fppm, 2),
            stdv_fppm: round_opt(a.stdv_fppm, 2),
            usg: round_opt(a.usg, 1),
            gsfppg: round_to(a.gsfppg, 2),
            stdv_gsfppg: round_opt(a.stdv_gsfppg, 2),
            gsmpg: round_to(a.gsmpg, 1),
            stdv_gsmpg: round_opt(a.stdv_gsmpg, 2),
            gsfppm: round_to(a.gsfppm, 2),
            stdv_gsfppm: round_opt(a.stdv_gsfppm, 2),
            pts: round_opt(b.pts, 1),
            reb: round_opt(b.reb, 1),
            ast: round_opt(b.ast, 1),
            stl: round_opt(b.stl, 1),
            blk: round_opt(b.blk, 1),
            tov: round_opt(b.tov, 1),
        }
    }
}

/// A split-report row: the partition label followed by the usual columns.
/// Kept flat because CSV writers cannot serialize nested structs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SplitDisplayRow {
    pub split: String,
    pub player_id: i64,
    pub player: Option<String>,
    pub season: SeasonKey,
    pub team: Option<String>,
    pub gp: u32,
    pub gs: u32,
    pub mpg: Option<f64>,
    pub gsmpg: f64,
    pub fppg: Option<f64>,
    pub gsfppg: f64,
    pub fppm: f64,
    pub gsfppm: f64,
    pub usg: Option<f64>,
    pub pts: Option<f64>,
}

impl SplitDisplayRow {
    pub const COLUMNS: [&'static str; 15] = [
        "SPLIT", "PLAYER_ID", "PLAYER", "SEASON", "TEAM", "GP", "GS", "MPG", "GSMPG", "FPPG",
        "GSFPPG", "FPPM", "GSFPPM", "USG", "PTS",
    ];
}

impl From<&PartitionRow> for SplitDisplayRow {
    fn from(split: &PartitionRow) -> Self {
        let d = DisplayRow::from(&split.row);
        SplitDisplayRow {
            split: split.partition.clone(),
            player_id: d.player_id,
            player: d.player,
            season: d.season,
            team: d.team,
            gp: d.gp,
            gs: d.gs,
            mpg: d.mpg,
            gsmpg: d.gsmpg,
            fppg: d.fppg,
            gsfppg: d.gsfppg,
            fppm: d.fppm,
            gsfppm: d.gsfppm,
            usg: d.usg,
            pts: d.pts,
        }
    }
}

pub fn display_rows(rows: &[AggregateRow]) -> Vec<DisplayRow> {
    rows.iter().map(DisplayRow::from).collect()
}

pub fn split_display_rows(rows: &[PartitionRow]) -> Vec<SplitDisplayRow> {
    rows.iter().map(SplitDisplayRow::from).collect()
}

/// Order rows the way slate sheets list them: team, then player, then most
/// recent season first. Unmapped names and teams sort last.
pub fn sort_for_slate(rows: &mut [DisplayRow]) {
    rows.sort_by(|a, b| {
        let team = |r: &DisplayRow| (r.team.is_none(), r.team.clone());
        let player = |r: &DisplayRow| (r.player.is_none(), r.player.clone());
        team(a)
            .cmp(&team(b))
            .then_with(|| player(a).cmp(&player(b)))
            .then_with(|| b.season.cmp(&a.season))
    });
}
