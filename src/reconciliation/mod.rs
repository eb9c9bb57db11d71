//! Pure reconciliation logic.
//!
//! This module turns raw punches into shift records without touching any
//! I/O: punch normalization, shift assembly with night-shift pairing,
//! auto-completion of incomplete shifts, status classification and
//! per-key deduplication. The [`crate::engine`] module drives these steps
//! in order for a date window.

mod assembler;
mod auto_completion;
mod classifier;
mod dedup;
mod normalizer;

pub use assembler::{Assembly, DurationGuard, OpenShifts, assemble, assemble_punch};
pub use auto_completion::{AutoCompletionPolicy, cutoff};
pub use classifier::{classify_checkin, classify_checkout, classify_shift};
pub use dedup::{Candidate, DedupOutcome, Origin, dedup, preference};
pub use normalizer::{NormalizedBatch, NormalizerContext, normalize};
