//! Orchestration around the `streamdec-audio` core: per-stream processor lifecycle,
//! target rate selection, configuration and the byte sink the stream is written to.

pub mod config;
pub mod error;
pub mod policy;
pub mod stage;

pub use error::StageError;
pub use policy::{RateSelection, TargetRatePolicy};
pub use stage::{EventCallback, StageEvent, StreamStage};
