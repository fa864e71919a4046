// Recency ranking of a player's games: current-team resolution and
// last-N-games windows.

use std::cmp::Ordering;

use crate::model::GameLogRecord;

/// Anything that can be ranked by recency. Implemented for plain log records
/// and for records already carrying season information.
pub trait Dated {
    fn log(&self) -> &GameLogRecord;
}

impl Dated for GameLogRecord {
    fn log(&self) -> &GameLogRecord {
        self
    }
}

impl<T: Dated + ?Sized> Dated for &T {
    fn log(&self) -> &GameLogRecord {
        (**self).log()
    }
}

impl Dated for crate::season::NormalizedRecord<'_> {
    fn log(&self) -> &GameLogRecord {
        self.record
    }
}

/// A record together with its 1-based recency rank (1 = most recent).
#[derive(Debug, Clone, Copy)]
pub struct Ranked<T> {
    pub rank: usize,
    pub item: T,
}

/// Most recent first; same-day games fall back to game id, descending.
fn recency_order<T: Dated>(a: &T, b: &T) -> Ordering {
    let (a, b) = (a.log(), b.log());
    b.date.cmp(&a.date).then_with(|| b.game_id.cmp(&a.game_id))
}

/// Order one player's records by date descending and number them 1..=n.
///
/// The sort is stable, so records that tie on both date and game id keep
/// their input order and the ranking is reproducible.
pub fn rank_by_recency<T: Dated>(records: impl IntoIterator<Item = T>) -> Vec<Ranked<T>> {
    let mut items: Vec<T> = records.into_iter().collect();
    items.sort_by(recency_order);
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| Ranked { rank: i + 1, item })
        .collect()
}

/// The raw team of the player's most recent record.
pub fn current_team<'a, T: Dated + 'a>(records: impl IntoIterator<Item = &'a T>) -> Option<&'a str> {
    records
        .into_iter()
        .min_by(|a, b| recency_order(*a, *b))
        .map(|r| r.log().team.as_str())
}

/// Records with rank <= `n`. A player with fewer than `n` games keeps all of
/// them; `n == 0` yields an empty window.
pub fn last_n<T: Dated>(records: impl IntoIterator<Item = T>, n: usize) -> Vec<T> {
    rank_by_recency(records)
        .into_iter()
        .take_while(|r| r.rank <= n)
        .map(|r| r.item)
        .collect()
}
