//! pcpexport-core: rate computation and metric export for sampled system
//! activity counters.
//!
//! Provides:
//! - `model`: snapshot records per statistics category, double buffer
//! - `delta`: rate and percentage arithmetic with clamping
//! - `reconcile`: matching current entities with previous ones
//! - `visibility`: CPU bitmap and device allow-list predicates
//! - `sink`: metric sink contract, recording and text sinks
//! - `export`: per-category exporters and the per-period pass
//! - `config`: activity selection and export options
//! - `source`: loading recorded snapshot series (JSON, zstd)

pub mod config;
pub mod delta;
pub mod export;
pub mod model;
pub mod reconcile;
pub mod sink;
pub mod source;
pub mod visibility;
