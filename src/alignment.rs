//! Aligned sequences, the reference profile, and removal of query insertions.
use crate::error::ConfigurationError;
use crate::fasta::FASTARecord;
use crate::GAP;

/// A row of a multiple sequence alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedSequence {
    pub id: String,
    pub seq: Vec<u8>,
}

impl AlignedSequence {
    pub fn new<I: Into<String>, S: Into<Vec<u8>>>(id: I, seq: S) -> Self {
        Self {
            id: id.into(),
            seq: seq.into(),
        }
    }
    pub fn width(&self) -> usize {
        self.seq.len()
    }
}

impl From<FASTARecord> for AlignedSequence {
    fn from((id, seq): FASTARecord) -> Self {
        Self { id, seq }
    }
}

/// Mutually aligned reference sequences. Never empty, every row has the same width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    rows: Vec<AlignedSequence>,
    width: usize,
}

impl Profile {
    pub fn new(rows: Vec<AlignedSequence>) -> Result<Self, ConfigurationError> {
        let width = rows
            .first()
            .map(|row| row.width())
            .ok_or(ConfigurationError::EmptyProfile)?;
        if let Some(row) = rows.iter().find(|row| row.width() != width) {
            return Err(ConfigurationError::RaggedProfile {
                id: row.id.clone(),
                expected: width,
                found: row.width(),
            });
        }
        Ok(Self { rows, width })
    }
    pub fn rows(&self) -> &[AlignedSequence] {
        &self.rows
    }
    pub fn width(&self) -> usize {
        self.width
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    fn column_is_gap(&self, column: usize) -> bool {
        self.rows.iter().all(|row| row.seq[column] == GAP)
    }
}

/// The profile rows and the query as returned by an aligner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedBlock {
    pub goods: Profile,
    pub query: AlignedSequence,
}

/// Remove the columns where every profile row has a gap but the query has a symbol.
/// Returns new sequences; the arguments are left as they are.
///
/// Whether a column is removed depends on that column alone, so one pass over
/// the columns removes exactly what a delete-and-rescan loop would.
pub fn remove_insertions(
    profile: &Profile,
    query: &AlignedSequence,
) -> Result<(Profile, AlignedSequence), ConfigurationError> {
    if profile.width() != query.width() {
        return Err(ConfigurationError::QueryWidthMismatch {
            id: query.id.clone(),
            expected: profile.width(),
            found: query.width(),
        });
    }
    let keep: Vec<bool> = query
        .seq
        .iter()
        .enumerate()
        .map(|(column, &base)| base == GAP || !profile.column_is_gap(column))
        .collect();
    let retain = |seq: &[u8]| -> Vec<u8> {
        seq.iter()
            .zip(keep.iter())
            .filter_map(|(&base, &keep)| if keep { Some(base) } else { None })
            .collect()
    };
    let rows: Vec<_> = profile
        .rows()
        .iter()
        .map(|row| AlignedSequence::new(row.id.as_str(), retain(&row.seq)))
        .collect();
    let query = AlignedSequence::new(query.id.as_str(), retain(&query.seq));
    let profile = Profile::new(rows)?;
    Ok((profile, query))
}
