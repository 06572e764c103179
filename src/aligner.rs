//! External profile aligners.
use crate::alignment::{AlignedBlock, AlignedSequence, Profile};
use crate::error::CorrectionError;
use crate::fasta::{self, FASTARecord};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Align a raw query against the profile.
/// The returned block has the profile rows and the query at one common width.
pub trait Aligner: Sync {
    fn align(&self, profile: &Profile, query: &FASTARecord) -> Result<AlignedBlock, CorrectionError>;
}

/// Clustal Omega in profile-profile mode.
#[derive(Debug, Clone)]
pub struct ClustalOmega {
    binary: PathBuf,
}

impl std::default::Default for ClustalOmega {
    fn default() -> Self {
        Self::new("clustalo")
    }
}

impl ClustalOmega {
    pub fn new<P: AsRef<Path>>(binary: P) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }
}

fn write_records(path: &Path, records: &[FASTARecord]) -> std::io::Result<()> {
    let mut wtr = std::fs::File::create(path).map(BufWriter::new)?;
    fasta::write_fasta(&mut wtr, records)?;
    wtr.flush()
}

/// Split the aligner's output: every record but the last is a profile row,
/// the last one is the query.
pub fn split_block(
    id: &str,
    mut records: Vec<FASTARecord>,
) -> Result<AlignedBlock, CorrectionError> {
    let failure = |reason: String| CorrectionError::Alignment {
        id: id.to_string(),
        reason,
    };
    let query: AlignedSequence = records
        .pop()
        .map(AlignedSequence::from)
        .ok_or_else(|| failure("empty output".to_string()))?;
    if query.id != id {
        return Err(failure(format!("last record is {}", query.id)));
    }
    let rows: Vec<_> = records.into_iter().map(AlignedSequence::from).collect();
    let goods = Profile::new(rows).map_err(|why| failure(why.to_string()))?;
    if goods.width() != query.width() {
        return Err(failure(format!(
            "query width {} differs from profile width {}",
            query.width(),
            goods.width()
        )));
    }
    Ok(AlignedBlock { goods, query })
}

impl Aligner for ClustalOmega {
    fn align(&self, profile: &Profile, query: &FASTARecord) -> Result<AlignedBlock, CorrectionError> {
        let id = query.0.as_str();
        let failure = |reason: String| CorrectionError::Alignment {
            id: id.to_string(),
            reason,
        };
        let dir = tempfile::Builder::new().prefix("hmmfix").tempdir()?;
        let profile_path = dir.path().join("profile.fasta");
        let query_path = dir.path().join("query.fasta");
        let output_path = dir.path().join("aligned.fasta");
        let rows: Vec<FASTARecord> = profile
            .rows()
            .iter()
            .map(|row| (row.id.clone(), row.seq.clone()))
            .collect();
        write_records(&profile_path, &rows)?;
        write_records(&query_path, std::slice::from_ref(query))?;
        debug!("Running {}", self.binary.display());
        let output = Command::new(&self.binary)
            .arg("--profile1")
            .arg(&profile_path)
            .arg("--profile2")
            .arg(&query_path)
            .arg("--outfile")
            .arg(&output_path)
            .arg("--auto")
            .arg("--force")
            .output()
            .map_err(|why| failure(format!("{}: {}", self.binary.display(), why)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failure(format!("{} ({})", output.status, stderr.trim())));
        }
        let records = fasta::read_fasta(&output_path).map_err(|why| failure(why.to_string()))?;
        split_block(id, records)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    fn rec(id: &str, seq: &[u8]) -> FASTARecord {
        (id.to_string(), seq.to_vec())
    }
    #[test]
    fn split_last_record_is_the_query() {
        let records = vec![rec("g1", b"AC-GT"), rec("g2", b"ACTGT"), rec("q", b"AC-GA")];
        let block = split_block("q", records).unwrap();
        assert_eq!(block.goods.len(), 2);
        assert_eq!(block.goods.rows()[1].id, "g2");
        assert_eq!(block.query, AlignedSequence::new("q", b"AC-GA".to_vec()));
    }
    #[test]
    fn malformed_outputs() {
        assert!(matches!(
            split_block("q", vec![]),
            Err(CorrectionError::Alignment { .. })
        ));
        assert!(matches!(
            split_block("q", vec![rec("q", b"ACGT")]),
            Err(CorrectionError::Alignment { .. })
        ));
        let ragged = vec![rec("g1", b"ACGT"), rec("q", b"ACG")];
        assert!(matches!(
            split_block("q", ragged),
            Err(CorrectionError::Alignment { .. })
        ));
        let wrong = vec![rec("g1", b"ACGT"), rec("other", b"ACGT")];
        assert!(matches!(
            split_block("q", wrong),
            Err(CorrectionError::Alignment { .. })
        ));
    }
    #[test]
    fn missing_binary_is_an_alignment_failure() {
        let aligner = ClustalOmega::new("/nonexistent/clustalo");
        let profile = Profile::new(vec![AlignedSequence::new("g1", b"ACGT".to_vec())]).unwrap();
        let query = rec("q", b"ACGT");
        match aligner.align(&profile, &query) {
            Err(CorrectionError::Alignment { id, .. }) => assert_eq!(id, "q"),
            other => panic!("{:?}", other),
        }
    }
}
