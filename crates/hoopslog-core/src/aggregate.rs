// Partitioned aggregation with null-safe averages and rates.
//
// Three null conventions coexist:
// - plain averages (MPG, FPPG, SALPG, USG) are `None` when nothing was
//   observed;
// - starter averages (GSMPG, GSFPPG) default to 0 when there are no starts;
// - rates (FPPM, GSFPPM) are sum(points) / sum(minutes) and fall back to 0
//   when the minutes total is zero.
// The rate deviations (STDV_FPPM, STDV_GSFPPM) are the spread of per-game
// rates, where a game without usable minutes or points counts as 0.

use std::collections::BTreeMap;

use crate::rank::Dated;

// ---------------------------------------------------------------------------
// Running statistics
// ---------------------------------------------------------------------------

/// Count, sum, mean and variance of a stream of values, skipping nulls.
/// Uses Welford's update so the sample deviation is stable for long streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStat {
    count: u32,
    sum: f64,
    mean: f64,
    m2: f64,
}

impl RunningStat {
    pub fn push(&mut self, value: Option<f64>) {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return;
        };
        self.count += 1;
        self.sum += v;
        let delta = v - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (v - self.mean);
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Arithmetic mean, or `None` when no value was observed.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Sample standard deviation (n - 1 denominator); needs two values.
    pub fn sample_stdev(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).sqrt())
    }
}

/// `numerator / denominator`, or 0 when the denominator is zero or not finite.
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Fantasy points per minute of a single game.
fn game_rate(points: Option<f64>, minutes: Option<f64>) -> f64 {
    match (points, minutes) {
        (Some(p), Some(m)) => ratio_or_zero(p, m),
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Per-game box-score averages. `None` when the partition has no value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxScoreAverages {
    pub pts: Option<f64>,
    pub reb: Option<f64>,
    pub ast: Option<f64>,
    pub stl: Option<f64>,
    pub blk: Option<f64>,
    pub tov: Option<f64>,
}

/// Derived metrics for one partition, at full precision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Averages {
    pub gp: u32,
    pub gs: u32,
    pub mpg: Option<f64>,
    pub fppg: Option<f64>,
    pub salpg: Option<f64>,
    pub usg: Option<f64>,
    pub gsmpg: f64,
    pub gsfppg: f64,
    pub fppm: f64,
    pub gsfppm: f64,
    pub stdv_mpg: Option<f64>,
    pub stdv_fppg: Option<f64>,
    pub stdv_gsmpg: Option<f64>,
    pub stdv_gsfppg: Option<f64>,
    pub stdv_fppm: Option<f64>,
    pub stdv_gsfppm: Option<f64>,
    pub box_score: BoxScoreAverages,
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Folds log records into [`Averages`].
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    gp: u32,
    gs: u32,
    minutes: RunningStat,
    points: RunningStat,
    salary: RunningStat,
    usage: RunningStat,
    gs_minutes: RunningStat,
    gs_points: RunningStat,
    game_rate: RunningStat,
    gs_game_rate: RunningStat,
    pts: RunningStat,
    reb: RunningStat,
    ast: RunningStat,
    stl: RunningStat,
    blk: RunningStat,
    tov: RunningStat,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T: Dated>(&mut self, item: &T) {
        let r = item.log();
        self.gp += 1;
        self.minutes.push(r.minutes);
        self.points.push(r.fantasy_points);
        self.salary.push(r.salary);
        self.usage.push(r.usage);
        let rate = game_rate(r.fantasy_points, r.minutes);
        self.game_rate.push(Some(rate));
        if r.started {
            self.gs += 1;
            self.gs_minutes.push(r.minutes);
            self.gs_points.push(r.fantasy_points);
            self.gs_game_rate.push(Some(rate));
        }
        let b = &r.box_score;
        self.pts.push(b.pts);
        self.reb.push(b.reb);
        self.ast.push(b.ast);
        self.stl.push(b.stl);
        self.blk.push(b.blk);
        self.tov.push(b.tov);
    }

    pub fn finish(&self) -> Averages {
        Averages {
            gp: self.gp,
            gs: self.gs,
            mpg: self.minutes.mean(),
            fppg: self.points.mean(),
            salpg: self.salary.mean(),
            usg: self.usage.mean(),
            gsmpg: self.gs_minutes.mean().unwrap_or(0.0),
            gsfppg: self.gs_points.mean().unwrap_or(0.0),
            fppm: ratio_or_zero(self.points.sum(), self.minutes.sum()),
            gsfppm: ratio_or_zero(self.gs_points.sum(), self.gs_minutes.sum()),
            stdv_mpg: self.minutes.sample_stdev(),
            stdv_fppg: self.points.sample_stdev(),
            stdv_gsmpg: self.gs_minutes.sample_stdev(),
            stdv_gsfppg: self.gs_points.sample_stdev(),
            stdv_fppm: self.game_rate.sample_stdev(),
            stdv_gsfppm: self.gs_game_rate.sample_stdev(),
            box_score: BoxScoreAverages {
                pts: self.pts.mean(),
                reb: self.reb.mean(),
                ast: self.ast.mean(),
                stl: self.stl.mean(),
                blk: self.blk.mean(),
                tov: self.tov.mean(),
            },
        }
    }
}

/// Aggregate a single partition.
pub fn aggregate<T: Dated>(records: impl IntoIterator<Item = T>) -> Averages {
    let mut acc = Accumulator::new();
    for r in records {
        acc.push(&r);
    }
    acc.finish()
}

/// Group records by key. Keys come back sorted so report output is stable.
pub fn group_by<T, K, F>(records: impl IntoIterator<Item = T>, mut key: F) -> BTreeMap<K, Vec<T>>
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for r in records {
        groups.entry(key(&r)).or_default().push(r);
    }
    groups
}
