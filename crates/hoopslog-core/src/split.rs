// Two-way and custom partitions of a player's games.
//
// A date split relates two otherwise unrelated record streams only by date:
// the reference group's records produce a set of dates, and the target's
// records are partitioned by membership in that set.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::aggregate::Averages;
use crate::rank::Dated;

// ---------------------------------------------------------------------------
// Date membership
// ---------------------------------------------------------------------------

/// Sorted, de-duplicated set of dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateSet {
    dates: Vec<NaiveDate>,
}

impl DateSet {
    /// Distinct dates of `records`, keeping only those on or after
    /// `lower_bound` when one is given.
    pub fn from_records<T: Dated>(
        records: impl IntoIterator<Item = T>,
        lower_bound: Option<NaiveDate>,
    ) -> Self {
        let dates = records
            .into_iter()
            .map(|r| r.log().date)
            .filter(|d| lower_bound.map_or(true, |lb| *d >= lb));
        dates.collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl FromIterator<NaiveDate> for DateSet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        let mut dates: Vec<NaiveDate> = iter.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }
}

// ---------------------------------------------------------------------------
// Partitioning
// ---------------------------------------------------------------------------

/// Records split by whether their date is in the set. Every input record
/// lands in exactly one side.
#[derive(Debug, Clone)]
pub struct TwoWaySplit<T> {
    pub in_set: Vec<T>,
    pub out_of_set: Vec<T>,
}

pub fn two_way_split<T: Dated>(records: impl IntoIterator<Item = T>, dates: &DateSet) -> TwoWaySplit<T> {
    let (in_set, out_of_set): (Vec<T>, Vec<T>) = records
        .into_iter()
        .partition(|r| dates.contains(r.log().date));
    TwoWaySplit { in_set, out_of_set }
}

/// Partition by an arbitrary key (venue, opponent, ...). Records whose key is
/// `None` are dropped from every partition.
pub fn partition_by<T, K, F>(records: impl IntoIterator<Item = T>, mut key: F) -> BTreeMap<K, Vec<T>>
where
    K: Ord,
    F: FnMut(&T) -> Option<K>,
{
    let mut parts: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for r in records {
        if let Some(k) = key(&r) {
            parts.entry(k).or_default().push(r);
        }
    }
    parts
}

// ---------------------------------------------------------------------------
// Post-aggregation filter
// ---------------------------------------------------------------------------

/// Reporting filter applied after aggregation. Partitions that fail are
/// dropped from the report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HavingFilter {
    /// Minimum box-score points per game every partition must reach.
    pub min_points_per_game: Option<f64>,
}

impl HavingFilter {
    pub fn accepts(&self, averages: &Averages) -> bool {
        match self.min_points_per_game {
            None => true,
            Some(min) => averages.box_score.pts.is_some_and(|ppg| ppg >= min),
        }
    }

    /// True when every partition passes.
    pub fn accepts_all<'a>(&self, partitions: impl IntoIterator<Item = &'a Averages>) -> bool {
        partitions.into_iter().all(|a| self.accepts(a))
    }
}
