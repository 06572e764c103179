//! Correct every query against one profile.
use crate::aligner::Aligner;
use crate::alignment::{remove_insertions, AlignedBlock, Profile};
use crate::error::CorrectionError;
use crate::fasta::FASTARecord;
use crate::model::ProfileHmm;
use crate::reconstruct::reconstruct;
use crate::viterbi::{viterbi, HiddenMarkovModel};
use crate::{CorrectionConfig, GAP};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// What happened to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub id: String,
    /// Width of the alignment returned by the aligner.
    pub aligned_width: usize,
    /// Width after the query insertions were removed.
    pub normalized_width: usize,
    /// Gaps in the normalized query.
    pub query_gaps: usize,
    pub states: usize,
    pub observations: usize,
    pub probability: f64,
}

/// A corrected query and its summary.
#[derive(Debug, Clone)]
pub struct Corrected {
    pub record: FASTARecord,
    pub summary: RecordSummary,
}

/// Normalize, build, decode and reconstruct one aligned query.
pub fn correct_alignment(
    block: &AlignedBlock,
    config: &CorrectionConfig,
) -> Result<Corrected, CorrectionError> {
    let id = block.query.id.as_str();
    let (goods, query) = remove_insertions(&block.goods, &block.query)?;
    info!(
        "{}\tRemoved {} inserted columns",
        id,
        block.query.width() - query.width()
    );
    let model = ProfileHmm::build(&goods, &query, config.max_states)?;
    info!(
        "{}\tModel has {} states over {} observations",
        id,
        model.states().len(),
        model.observations().len()
    );
    let decoded = viterbi(&model, model.observations()).ok_or(CorrectionError::EmptyModel)?;
    info!("{}\tViterbi probability {}", id, decoded.probability);
    let seq = reconstruct(&decoded.path);
    let summary = RecordSummary {
        id: id.to_string(),
        aligned_width: block.query.width(),
        normalized_width: query.width(),
        query_gaps: bytecount::count(&query.seq, GAP),
        states: model.states().len(),
        observations: model.observations().len(),
        probability: decoded.probability,
    };
    Ok(Corrected {
        record: (id.to_string(), seq),
        summary,
    })
}

/// Align one raw query and correct it.
pub fn correct_record<A: Aligner>(
    profile: &Profile,
    query: &FASTARecord,
    aligner: &A,
    config: &CorrectionConfig,
) -> Result<Corrected, CorrectionError> {
    info!("Fixing {}", query.0);
    let block = aligner.align(profile, query)?;
    info!("{}\tAligned to width {}", query.0, block.query.width());
    let corrected = correct_alignment(&block, config)?;
    info!("{}\tCorrected ({} bases)", query.0, corrected.record.1.len());
    Ok(corrected)
}

/// Correct every query. The result keeps the input order.
/// A record that fails is logged and left out; a fatal error stops the run.
pub fn correct_all<A: Aligner>(
    profile: &Profile,
    queries: &[FASTARecord],
    aligner: &A,
    config: &CorrectionConfig,
) -> Result<Vec<Corrected>, CorrectionError> {
    // Indexed collect keeps the input order whatever the completion order is.
    // A fatal error short-circuits the collect; records not yet started are skipped.
    let results: Vec<_> = queries
        .par_iter()
        .map(|query| match correct_record(profile, query, aligner, config) {
            Err(why) if why.is_fatal() => Err(why),
            res => Ok(res),
        })
        .collect::<Result<Vec<_>, CorrectionError>>()?;
    let mut corrected = Vec::with_capacity(queries.len());
    for (query, result) in queries.iter().zip(results) {
        match result {
            Ok(res) => corrected.push(res),
            Err(why) => error!("{}\tSkipped: {}", query.0, why),
        }
    }
    Ok(corrected)
}
