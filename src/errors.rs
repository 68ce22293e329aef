use crate::fastq::Origin;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal conditions that stop a trimming run.
///
/// Reads without an adapter anchor are not errors; they are silently dropped by the
/// trim functions.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error opening or creating \"{file}\": {source}")]
    FileIo {
        file: String,
        source: std::io::Error,
    },

    #[error("Error reading from {origin}: {source}")]
    StreamIo {
        origin: Origin,
        source: std::io::Error,
    },

    #[error("Error writing records: {0}")]
    WriteIo(#[source] std::io::Error),

    #[error("Error parsing record on line {line} in {origin}: {reason}")]
    ParseRecord {
        origin: Origin,
        line: usize,
        reason: &'static str,
    },

    #[error("Quality string has {qual} bytes but sequence has {seq}")]
    RecordLength { seq: usize, qual: usize },

    #[error("Line {line} in {origin} is longer than the maximum of {max} bytes")]
    LineTooLong {
        origin: Origin,
        line: usize,
        max: usize,
    },

    #[error("Unmatched pair on line {line}: \"{head1}\" in {origin1} vs \"{head2}\" in {origin2}")]
    HeaderMismatch {
        origin1: Origin,
        origin2: Origin,
        line: usize,
        head1: String,
        head2: String,
    },

    #[error("Could not parse config in {context}: {source}")]
    Config {
        context: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub fn utf8(b: &[u8]) -> String {
    String::from_utf8_lossy(b).into_owned()
}
