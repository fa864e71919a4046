// Report definitions over a dataset snapshot.
//
// Every report is a pure function of the dataset and a `ReportParams` value:
// normalize season labels once, scope the rows, group, aggregate, and resolve
// display names and team abbreviations at the end.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use thiserror::Error;
use tracing::{debug, warn};

use crate::aggregate::{aggregate, group_by, Averages};
use crate::model::Dataset;
use crate::rank;
use crate::season::{self, NormalizedLogs, NormalizedRecord, SeasonKey, SeasonType};
use crate::split::{partition_by, two_way_split, DateSet, HavingFilter};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("report `{report}` requires the `{parameter}` parameter")]
    MissingParameter {
        report: &'static str,
        parameter: &'static str,
    },
}

/// Per-invocation report parameters. Filters left as `None` do not restrict.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportParams {
    /// Games in the last-N window. Has no default.
    pub window_size: usize,
    /// Exact display names to keep.
    pub player_filter: Option<BTreeSet<String>>,
    /// Exact team abbreviation of the reported team.
    pub team_filter: Option<String>,
    pub date_lower_bound: Option<NaiveDate>,
    pub date_upper_bound: Option<NaiveDate>,
    /// Player ids whose game dates define a date split.
    pub reference_group: Option<BTreeSet<i64>>,
    pub seasons: Option<BTreeSet<SeasonKey>>,
    pub season_type: Option<SeasonType>,
    pub having: HavingFilter,
}

impl ReportParams {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            player_filter: None,
            team_filter: None,
            date_lower_bound: None,
            date_upper_bound: None,
            reference_group: None,
            seasons: None,
            season_type: None,
            having: HavingFilter::default(),
        }
    }

    pub fn with_players<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.player_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_team(mut self, abbreviation: impl Into<String>) -> Self {
        self.team_filter = Some(abbreviation.into());
        self
    }

    pub fn with_date_lower_bound(mut self, date: NaiveDate) -> Self {
        self.date_lower_bound = Some(date);
        self
    }

    pub fn with_date_upper_bound(mut self, date: NaiveDate) -> Self {
        self.date_upper_bound = Some(date);
        self
    }

    pub fn with_reference_group(mut self, player_ids: impl IntoIterator<Item = i64>) -> Self {
        self.reference_group = Some(player_ids.into_iter().collect());
        self
    }

    pub fn with_seasons(mut self, seasons: impl IntoIterator<Item = SeasonKey>) -> Self {
        self.seasons = Some(seasons.into_iter().collect());
        self
    }

    pub fn with_season_type(mut self, season_type: SeasonType) -> Self {
        self.season_type = Some(season_type);
        self
    }

    pub fn with_having(mut self, having: HavingFilter) -> Self {
        self.having = having;
        self
    }
}

/// First date of a trailing `days`-day window ending at `as_of`, both ends
/// included: `days = 1` is `as_of` alone. `days = 0` is treated as 1.
pub fn lower_bound_for_last_days(as_of: NaiveDate, days: u32) -> NaiveDate {
    as_of
        .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN)
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

/// One aggregated partition, keyed by season and player (and team where the
/// report groups by it). `player` and `team` are `None` when the reference
/// tables have no entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub season_type: SeasonType,
    pub season: SeasonKey,
    pub player_id: i64,
    pub player: Option<String>,
    pub team: Option<String>,
    pub averages: Averages,
}

/// A row of a custom split; `partition` names the side (`ON`/`OFF` for date
/// splits, the venue code for venue splits).
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRow {
    pub partition: String,
    pub row: AggregateRow,
}

pub const ON_REFERENCE_DATES: &str = "ON";
pub const OFF_REFERENCE_DATES: &str = "OFF";

/// Rows of one season type, as the regular-season and playoff views expose.
pub fn season_type_view(rows: &[AggregateRow], season_type: SeasonType) -> Vec<AggregateRow> {
    rows.iter()
        .filter(|r| r.season_type == season_type)
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

type PlayerSeason = (SeasonType, SeasonKey, i64);

/// Runs reports against a borrowed dataset. Season labels are classified once
/// on construction.
pub struct ReportEngine<'a> {
    dataset: &'a Dataset,
    normalized: NormalizedLogs<'a>,
}

impl<'a> ReportEngine<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        let normalized = season::normalize(&dataset.logs);
        let engine = Self {
            dataset,
            normalized,
        };
        engine.flag_unmapped();
        engine
    }

    /// Labels that were excluded from every report, with row counts.
    pub fn unrecognized_segments(&self) -> &BTreeMap<String, usize> {
        &self.normalized.unrecognized
    }

    fn flag_unmapped(&self) {
        let mut teams = BTreeSet::new();
        let mut players = BTreeSet::new();
        for row in &self.normalized.rows {
            let r = row.record;
            if self.dataset.teams.abbreviation(&r.team).is_none() {
                teams.insert(r.team.as_str());
            }
            if self.dataset.players.name(r.player_id).is_none() {
                players.insert(r.player_id);
            }
        }
        for team in teams {
            warn!("no abbreviation mapped for team '{}'; reporting team as null", team);
        }
        for id in players {
            warn!("player id {} missing from directory; reporting name as null", id);
        }
    }

    fn player_name(&self, player_id: i64) -> Option<String> {
        self.dataset.players.name(player_id).map(str::to_string)
    }

    fn team_abbr(&self, raw: &str) -> Option<String> {
        self.dataset.teams.abbreviation(raw).map(str::to_string)
    }

    // -- scoping --

    fn in_season_scope(&self, row: &NormalizedRecord<'_>, params: &ReportParams) -> bool {
        let date = row.record.date;
        params.seasons.as_ref().map_or(true, |s| s.contains(&row.season))
            && params.season_type.map_or(true, |t| t == row.season_type)
            && params.date_lower_bound.map_or(true, |lb| date >= lb)
            && params.date_upper_bound.map_or(true, |ub| date <= ub)
    }

    fn in_scope(&self, row: &NormalizedRecord<'_>, params: &ReportParams) -> bool {
        self.in_season_scope(row, params)
            && params.player_filter.as_ref().map_or(true, |names| {
                self.dataset
                    .players
                    .name(row.record.player_id)
                    .is_some_and(|n| names.contains(n))
            })
    }

    fn scoped<'s>(
        &'s self,
        params: &'s ReportParams,
    ) -> impl Iterator<Item = &'s NormalizedRecord<'a>> + 's {
        self.normalized
            .rows
            .iter()
            .filter(move |row| self.in_scope(row, params))
    }

    fn passes_team_filter(team: Option<&str>, params: &ReportParams) -> bool {
        params
            .team_filter
            .as_deref()
            .map_or(true, |wanted| team == Some(wanted))
    }

    fn by_player_season<'s>(
        &'s self,
        params: &'s ReportParams,
    ) -> BTreeMap<PlayerSeason, Vec<&'s NormalizedRecord<'a>>> {
        group_by(self.scoped(params), |r| {
            (r.season_type, r.season, r.record.player_id)
        })
    }

    /// Row for a player-season whose reported team is the team of the most
    /// recent record in `records`.
    fn player_row(
        &self,
        key: PlayerSeason,
        records: &[&NormalizedRecord<'_>],
        averages: Averages,
    ) -> AggregateRow {
        let (season_type, season, player_id) = key;
        AggregateRow {
            season_type,
            season,
            player_id,
            player: self.player_name(player_id),
            team: rank::current_team(records).and_then(|raw| self.team_abbr(raw)),
            averages,
        }
    }

    // -- reports --

    /// Averages per season, player and team. A player traded mid-season gets
    /// one row per team.
    pub fn season_averages(&self, params: &ReportParams) -> Vec<AggregateRow> {
        let groups = group_by(self.scoped(params), |r| {
            (
                r.season_type,
                r.season,
                r.record.player_id,
                self.team_abbr(&r.record.team),
            )
        });
        let rows: Vec<AggregateRow> = groups
            .into_iter()
            .filter(|((.., team), _)| Self::passes_team_filter(team.as_deref(), params))
            .map(|((season_type, season, player_id, team), records)| AggregateRow {
                season_type,
                season,
                player_id,
                player: self.player_name(player_id),
                team,
                averages: aggregate(records),
            })
            .collect();
        debug!("season averages: {} rows", rows.len());
        rows
    }

    /// Season-long averages per player, reported under the player's current
    /// team (the team of their most recent game in the season).
    pub fn current_team_averages(&self, params: &ReportParams) -> Vec<AggregateRow> {
        let rows: Vec<AggregateRow> = self
            .by_player_season(params)
            .into_iter()
            .map(|(key, records)| {
                let averages = aggregate(records.iter().copied());
                self.player_row(key, &records, averages)
            })
            .filter(|row| Self::passes_team_filter(row.team.as_deref(), params))
            .collect();
        debug!("current-team averages: {} rows", rows.len());
        rows
    }

    /// Averages over each player's last `window_size` games of the season.
    pub fn last_n_games(&self, params: &ReportParams) -> Vec<AggregateRow> {
        let rows: Vec<AggregateRow> = self
            .by_player_season(params)
            .into_iter()
            .map(|(key, records)| {
                let window = rank::last_n(records.iter().copied(), params.window_size);
                self.player_row(key, &records, aggregate(window))
            })
            .filter(|row| Self::passes_team_filter(row.team.as_deref(), params))
            .collect();
        debug!(
            "last {} games: {} rows",
            params.window_size,
            rows.len()
        );
        rows
    }

    /// Averages over each player's games on or after `date_lower_bound`,
    /// reported under the team of their latest game in that range.
    pub fn since_date(&self, params: &ReportParams) -> Result<Vec<AggregateRow>, ReportError> {
        if params.date_lower_bound.is_none() {
            return Err(ReportError::MissingParameter {
                report: "since_date",
                parameter: "date_lower_bound",
            });
        }
        Ok(self.current_team_averages(params))
    }

    /// Averages over the `days` calendar days ending with `as_of`, so
    /// `days = 7` covers `as_of - 6 ..= as_of`. An existing lower bound in
    /// `params` wins when it is later.
    pub fn last_days(&self, params: &ReportParams, as_of: NaiveDate, days: u32) -> Vec<AggregateRow> {
        let bound = lower_bound_for_last_days(as_of, days);
        let mut windowed = params.clone();
        windowed.date_lower_bound = Some(params.date_lower_bound.map_or(bound, |lb| lb.max(bound)));
        windowed.date_upper_bound = Some(params.date_upper_bound.map_or(as_of, |ub| ub.min(as_of)));
        self.current_team_averages(&windowed)
    }

    /// Split each target player's games by whether the reference group played
    /// on that date. Reference players are not targets. Players failing the
    /// having filter in either partition are dropped.
    pub fn date_split(&self, params: &ReportParams) -> Result<Vec<PartitionRow>, ReportError> {
        let reference = params
            .reference_group
            .as_ref()
            .ok_or(ReportError::MissingParameter {
                report: "date_split",
                parameter: "reference_group",
            })?;

        let dates = DateSet::from_records(
            self.normalized.rows.iter().filter(|r| {
                reference.contains(&r.record.player_id) && self.in_season_scope(r, params)
            }),
            params.date_lower_bound,
        );
        if dates.is_empty() {
            warn!("date split: reference group has no games in scope; every game is OFF");
        } else {
            debug!("date split: {} reference dates", dates.len());
        }

        let targets = self
            .scoped(params)
            .filter(|r| !reference.contains(&r.record.player_id));
        let groups = group_by(targets, |r| (r.season_type, r.season, r.record.player_id));

        let mut rows = Vec::new();
        for (key, records) in groups {
            let split = two_way_split(records.iter().copied(), &dates);
            let on = aggregate(split.in_set);
            let off = aggregate(split.out_of_set);
            if !params.having.accepts_all([&on, &off]) {
                continue;
            }
            let on_row = self.player_row(key, &records, on);
            if !Self::passes_team_filter(on_row.team.as_deref(), params) {
                continue;
            }
            let off_row = AggregateRow {
                averages: off,
                ..on_row.clone()
            };
            rows.push(PartitionRow {
                partition: ON_REFERENCE_DATES.to_string(),
                row: on_row,
            });
            rows.push(PartitionRow {
                partition: OFF_REFERENCE_DATES.to_string(),
                row: off_row,
            });
        }
        Ok(rows)
    }

    /// Split each player's games by venue. Games without a venue are left out.
    pub fn venue_split(&self, params: &ReportParams) -> Vec<PartitionRow> {
        let mut rows = Vec::new();
        for (key, records) in self.by_player_season(params) {
            let parts = partition_by(records.iter().copied(), |r| r.record.venue);
            let averaged: Vec<_> = parts
                .into_iter()
                .map(|(venue, part)| (venue, aggregate(part)))
                .collect();
            if !params.having.accepts_all(averaged.iter().map(|(_, a)| a)) {
                continue;
            }
            for (venue, averages) in averaged {
                let row = self.player_row(key, &records, averages);
                if !Self::passes_team_filter(row.team.as_deref(), params) {
                    continue;
                }
                rows.push(PartitionRow {
                    partition: venue.code().to_string(),
                    row,
                });
            }
        }
        rows
    }
}
