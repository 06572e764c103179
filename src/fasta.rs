//! Very thin Fasta reader. Only support batch IO.
use std::io::{BufReader, Read};
use std::io::{BufWriter, Write};
pub type FASTARecord = (String, Vec<u8>);

/// Write records into the writer
pub fn write_fasta<W: Write>(
    wtr: &mut BufWriter<W>,
    records: &[FASTARecord],
) -> std::io::Result<()> {
    for (id, seq) in records {
        writeln!(wtr, ">{}\n{}", id, String::from_utf8_lossy(seq))?;
    }
    Ok(())
}

/// Read the file, return parsed fasta records.
pub fn read_fasta<P: AsRef<std::path::Path>>(file: P) -> std::io::Result<Vec<FASTARecord>> {
    let mut reader = std::fs::File::open(file).map(BufReader::new)?;
    let mut contents = vec![];
    reader.read_to_end(&mut contents)?;
    parse_fasta(&contents)
}

/// Parse fasta records. Sequences may span several lines.
/// Text before the first '>' or a record without an identifier is an error.
pub fn parse_fasta(contents: &[u8]) -> std::io::Result<Vec<FASTARecord>> {
    let malformed = |msg: &str| std::io::Error::new(std::io::ErrorKind::InvalidData, msg);
    let mut contents = contents.split(|&x| x == b'>');
    if let Some(first) = contents.next() {
        if first.iter().any(|x| !x.is_ascii_whitespace()) {
            return Err(malformed("fasta: text before the first header"));
        }
    }
    contents
        .map(|record| -> std::io::Result<FASTARecord> {
            let mut record = record.splitn(2, |&x| x == b'\n');
            let id = record
                .next()
                .and_then(|header| header.split(|x| x.is_ascii_whitespace()).next())
                .filter(|id| !id.is_empty())
                .ok_or_else(|| malformed("fasta: record without identifier"))?;
            let seq: Vec<_> = record
                .next()
                .unwrap_or(&[])
                .iter()
                .filter(|x| !x.is_ascii_whitespace())
                .copied()
                .collect();
            Ok((String::from_utf8_lossy(id).to_string(), seq))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn parse_multiline() {
        let input = b">seq1 some description\nACGT\nAC-T\n>seq2\r\nTTTT\r\n";
        let records = parse_fasta(input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ("seq1".to_string(), b"ACGTAC-T".to_vec()));
        assert_eq!(records[1], ("seq2".to_string(), b"TTTT".to_vec()));
    }
    #[test]
    fn parse_malformed() {
        assert!(parse_fasta(b"ACGT\n>seq1\nACGT\n").is_err());
        assert!(parse_fasta(b">\nACGT\n").is_err());
        assert!(parse_fasta(b"").unwrap().is_empty());
    }
    #[test]
    fn write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.fa");
        let records = vec![
            ("q1".to_string(), b"ACGT".to_vec()),
            ("q2".to_string(), b"GG-A".to_vec()),
        ];
        {
            let mut wtr = BufWriter::new(std::fs::File::create(&path).unwrap());
            write_fasta(&mut wtr, &records).unwrap();
            wtr.flush().unwrap();
        }
        assert_eq!(read_fasta(&path).unwrap(), records);
        assert!(read_fasta(dir.path().join("missing.fa")).is_err());
    }
}
