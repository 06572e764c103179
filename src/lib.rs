//! Correct a divergent sequence against a profile of trusted, aligned references.
//!
//! The query is aligned to the profile by an external aligner. Columns that are
//! insertions in the query are dropped, a hidden Markov model over `WINDOW`-long
//! contexts is generated from the alignment, and the most probable path through
//! it is the corrected sequence.
#[macro_use]
extern crate log;
pub mod aligner;
pub mod alignment;
pub mod error;
pub mod fasta;
pub mod gen_seq;
pub mod model;
pub mod pipeline;
pub mod reconstruct;
pub mod viterbi;
use serde::{Deserialize, Serialize};

pub use error::{ConfigurationError, CorrectionError};
pub use pipeline::{correct_alignment, correct_all, correct_record, Corrected, RecordSummary};

/// The gap symbol of alignments.
pub const GAP: u8 = b'-';
/// Length of the context a hidden state remembers.
pub const WINDOW: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Configurations
pub struct CorrectionConfig {
    /// A record whose model grows beyond this many states is skipped.
    pub max_states: usize,
    pub threads: usize,
}

impl CorrectionConfig {
    pub fn new(max_states: usize, threads: usize) -> Self {
        Self {
            max_states,
            threads,
        }
    }
}

impl std::default::Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            max_states: 1_000_000,
            threads: 1,
        }
    }
}
