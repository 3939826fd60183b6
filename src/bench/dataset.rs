//! Size statistics of a FASTA collection

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DatasetStats {
    /// Number of sequences
    pub sequences: u64,
    /// Residues across all sequences, line breaks excluded
    pub total_length: u64,
}

impl DatasetStats {
    pub fn from_path(path: &Path) -> io::Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Scan FASTA text. Residues before the first header count as one
    /// unnamed sequence.
    pub fn from_reader<R: BufRead>(mut reader: R) -> io::Result<Self> {
        let mut stats = DatasetStats::default();
        let mut in_sequence = false;
        let mut line = Vec::new();

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }

            if line.first() == Some(&b'>') {
                stats.sequences += 1;
                in_sequence = true;
                continue;
            }

            let residues = line
                .iter()
                .filter(|b| !b.is_ascii_whitespace())
                .count() as u64;
            if residues > 0 && !in_sequence {
                stats.sequences += 1;
                in_sequence = true;
            }
            stats.total_length += residues;
        }

        Ok(stats)
    }

    pub fn average_length(&self) -> f64 {
        if self.sequences == 0 {
            0.0
        } else {
            self.total_length as f64 / self.sequences as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_multi_line_records() {
        let fasta = ">s1 first\nACGT\nAC\n>s2\r\nGGGG\r\n>s3\nT\n";
        let stats = DatasetStats::from_reader(Cursor::new(fasta)).unwrap();
        assert_eq!(stats.sequences, 3);
        assert_eq!(stats.total_length, 11);
        assert!((stats.average_length() - 11.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_headerless_text() {
        let stats = DatasetStats::from_reader(Cursor::new("ACGT\nACGT")).unwrap();
        assert_eq!(stats.sequences, 1);
        assert_eq!(stats.total_length, 8);
    }

    #[test]
    fn test_empty() {
        let stats = DatasetStats::from_reader(Cursor::new("")).unwrap();
        assert_eq!(stats, DatasetStats::default());
        assert_eq!(stats.average_length(), 0.0);
    }
}
