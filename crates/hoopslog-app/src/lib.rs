// Library root: re-exports all modules so integration tests and the binary
// share one API.

pub mod config;
pub mod db;
pub mod export;
pub mod pipeline;
