// Report aggregation engine: season normalization, recency ranking and
// null-safe partitioned aggregation over fantasy basketball game logs.

pub mod aggregate;
pub mod model;
pub mod present;
pub mod rank;
pub mod report;
pub mod season;
pub mod split;
