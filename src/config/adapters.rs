use crate::{
    errors::{ConfigError, QcError},
    qc::hash_kmer,
};
use std::{fs, path::Path};

/// A named adapter, reduced to the 2-bit hash of its first K bases. The scan
/// looks these hashes up in the k-mer table to derive per-position adapter
/// content.
#[derive(Clone, Debug, PartialEq)]
pub struct Adapter {
    pub name:        String,
    pub prefix_hash: u64,
}

/// A named literal subsequence, matched against overrepresented prefixes to
/// suggest a possible source.
#[derive(Clone, Debug, PartialEq)]
pub struct Contaminant {
    pub name:     String,
    pub sequence: Vec<u8>,
}

/// The adapter list used when no adapters file is given.
const STOCK_ADAPTERS: [(&str, &str); 6] = [
    ("Illumina Universal Adapter", "AGATCGGAAGAG"),
    ("Illumina Small RNA 3' Adapter", "TGGAATTCTCGG"),
    ("Illumina Small RNA 5' Adapter", "GATCGTCGGACT"),
    ("Nextera Transposase Sequence", "CTGTCTCTTATA"),
    ("PolyA", "AAAAAAAAAAAA"),
    ("PolyG", "GGGGGGGGGGGG"),
];

/// Builds the stock adapter table for the given k-mer length.
pub fn default_adapters(kmer_len: usize) -> Vec<Adapter> {
    STOCK_ADAPTERS
        .iter()
        .map(|&(name, sequence)| Adapter {
            name:        name.to_string(),
            prefix_hash: hash_kmer(&sequence.as_bytes()[..kmer_len]),
        })
        .collect()
}

/// Yields the trimmed data lines of a `#`-commented table file.
fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Splits a table line into its name (all but the last token) and its
/// sequence (the last whitespace-separated token).
fn split_name_sequence<'a>(line: &'a str, file: &str, number: usize) -> Result<(&'a str, &'a str), ConfigError> {
    line.rsplit_once(|c: char| c.is_whitespace())
        .map(|(name, sequence)| (name.trim_end(), sequence))
        .ok_or_else(|| ConfigError::MalformedLine {
            file:   file.to_string(),
            line:   number,
            reason: "expected a name and a sequence".to_string(),
        })
}

/// Loads an adapters file: `#` comments, then lines whose last token is the
/// literal adapter sequence.
///
/// ## Errors
///
/// IO failures carry the path. An adapter containing a character outside
/// A/C/T/G, or shorter than the k-mer length, is a configuration error.
pub fn load_adapters(path: &Path, kmer_len: usize) -> Result<Vec<Adapter>, QcError> {
    let text = fs::read_to_string(path).map_err(QcError::io_at(path))?;
    parse_adapters(&text, &path.display().to_string(), kmer_len).map_err(QcError::from)
}

fn parse_adapters(text: &str, file: &str, kmer_len: usize) -> Result<Vec<Adapter>, ConfigError> {
    let mut adapters = Vec::new();

    for (number, line) in data_lines(text) {
        let (name, sequence) = split_name_sequence(line, file, number)?;

        if !sequence.bytes().all(|b| matches!(b, b'A' | b'C' | b'T' | b'G')) {
            return Err(ConfigError::AdapterAlphabet(name.to_string()));
        }
        if sequence.len() < kmer_len {
            return Err(ConfigError::AdapterTooShort {
                name: name.to_string(),
                kmer_len,
            });
        }

        adapters.push(Adapter {
            name:        name.to_string(),
            prefix_hash: hash_kmer(&sequence.as_bytes()[..kmer_len]),
        });
    }

    Ok(adapters)
}

/// Loads a contaminants file. Same shape as the adapters file, with no
/// alphabet validation on the sequence token.
///
/// ## Errors
///
/// IO failures carry the path; lines without at least a name and a sequence
/// are configuration errors.
pub fn load_contaminants(path: &Path) -> Result<Vec<Contaminant>, QcError> {
    let text = fs::read_to_string(path).map_err(QcError::io_at(path))?;
    parse_contaminants(&text, &path.display().to_string()).map_err(QcError::from)
}

fn parse_contaminants(text: &str, file: &str) -> Result<Vec<Contaminant>, ConfigError> {
    data_lines(text)
        .map(|(number, line)| {
            let (name, sequence) = split_name_sequence(line, file, number)?;
            Ok(Contaminant {
                name:     name.to_string(),
                sequence: sequence.as_bytes().to_vec(),
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::qc::decode_kmer;

    #[test]
    fn stock_adapters_hash_their_prefixes() {
        let adapters = default_adapters(7);
        assert_eq!(adapters.len(), STOCK_ADAPTERS.len());
        assert_eq!(adapters[0].name, "Illumina Universal Adapter");
        assert_eq!(decode_kmer(adapters[0].prefix_hash, 7), "AGATCGG");
    }

    #[test]
    fn adapter_lines_keep_multi_token_names() {
        let adapters = parse_adapters("# comment\nMy Favourite Adapter\tACGTACGTACGT\n", "adapters.txt", 4).unwrap();
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].name, "My Favourite Adapter");
        assert_eq!(decode_kmer(adapters[0].prefix_hash, 4), "ACGT");
    }

    #[test]
    fn non_nucleotide_adapters_are_rejected() {
        let err = parse_adapters("RNA Adapter\tACGUACGUACGU\n", "adapters.txt", 4).unwrap_err();
        assert!(matches!(err, ConfigError::AdapterAlphabet(name) if name == "RNA Adapter"));
    }

    #[test]
    fn short_adapters_are_rejected() {
        let err = parse_adapters("Stub\tACG\n", "adapters.txt", 4).unwrap_err();
        assert!(matches!(err, ConfigError::AdapterTooShort { kmer_len: 4, .. }));
    }

    #[test]
    fn contaminants_skip_alphabet_validation() {
        let list = parse_contaminants("Vector xyz\tACGUNRY\n", "contaminants.txt").unwrap();
        assert_eq!(list[0].name, "Vector xyz");
        assert_eq!(list[0].sequence, b"ACGUNRY");
    }

    #[test]
    fn lines_without_a_sequence_are_rejected() {
        assert!(parse_contaminants("loneword\n", "contaminants.txt").is_err());
    }
}
