//! Candidate scoring, selection, and publication cadence.
//!
//! Everything here is pure and synchronous: the pipeline feeds candidates
//! in, gets a verdict and a pick out, and owns all I/O itself.

pub mod cadence;
pub mod score;

pub use cadence::{is_filler_cycle, pick_topic};
pub use score::{Score, score, select_best};
