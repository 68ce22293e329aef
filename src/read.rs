use std::fmt;

use crate::errors::*;

/// Leading character of every FASTQ header line.
pub const MARKER: u8 = b'@';

/// One FASTQ record, kept as the four raw lines without their terminators.
///
/// The quality string always has the same length as the sequence: [`Record::new`]
/// rejects anything else, and the only mutation is [`Record::trim_front`], which cuts
/// both strings together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    head: Vec<u8>,
    seq: Vec<u8>,
    plus: Vec<u8>,
    qual: Vec<u8>,
}

impl Record {
    pub fn new(head: Vec<u8>, seq: Vec<u8>, plus: Vec<u8>, qual: Vec<u8>) -> Result<Self> {
        if seq.len() != qual.len() {
            return Err(Error::RecordLength {
                seq: seq.len(),
                qual: qual.len(),
            });
        }

        Ok(Self {
            head,
            seq,
            plus,
            qual,
        })
    }

    /// Full header line, including the leading marker.
    pub fn head(&self) -> &[u8] {
        &self.head
    }

    /// Header line with the leading marker stripped.
    pub fn id(&self) -> &[u8] {
        match self.head.split_first() {
            Some((&MARKER, rest)) => rest,
            _ => &self.head,
        }
    }

    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    pub fn plus(&self) -> &[u8] {
        &self.plus
    }

    pub fn qual(&self) -> &[u8] {
        &self.qual
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Remove the first `len` bases from both the sequence and the quality string.
    pub(crate) fn trim_front(&mut self, len: usize) {
        let len = len.min(self.seq.len());
        self.seq.drain(..len);
        self.qual.drain(..len);
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", utf8(&self.head))?;
        writeln!(f, "{}", utf8(&self.seq))?;
        writeln!(f, "{}", utf8(&self.plus))?;
        write!(f, "{}", utf8(&self.qual))
    }
}

/// Mates of one fragment, read in lockstep from two FASTQ streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordPair {
    pub r1: Record,
    pub r2: Record,
}

impl RecordPair {
    pub fn new(r1: Record, r2: Record) -> Self {
        Self { r1, r2 }
    }

    /// Whether both headers name the same fragment once the marker is stripped.
    pub fn ids_match(&self) -> bool {
        self.r1.id() == self.r2.id()
    }
}
