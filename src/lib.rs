//! Rust library for trimming an adapter anchor from the start of sequencing reads.
//!
//! # Overview
//! anchortrim looks for the `TATAGGG` adapter motif in the first 20 bases of each read
//! and cuts the read just past it. Reads without the motif are dropped. It streams
//! large FASTQ files, one file for single-end data or two files read in lockstep for
//! paired data, and spreads the trimming over a pool of worker threads.
//!
//! See [`fastq`] for reading and writing fastq records, [`trim`] for the anchor rules,
//! and [`pipeline`] for the multithreaded runs.
//!
//! ## Read structure
//! Here's an example fastq record:
//! ```text
//! @read6
//! ACGTTATAGGGACGTACGTACGT
//! +
//! IIIIIIIIIIIIIIIIIIIIIII
//! ```
//! The first, second, and fourth lines are the header, sequence, and quality scores,
//! respectively. The third line is copied through untouched. anchortrim keeps all four
//! lines of a record as raw bytes in a [`Record`].
//!
//! ## Anchors
//! The motif has to lie entirely inside the first 20 bases. Reads shorter than 20
//! bases never match and are dropped.
//!
//! Single-end and paired reads choose the anchor differently:
//! * Single-end: start at the right-most occurrence, then keep jumping to an earlier
//!   occurrence that ends before the current one starts. The last one reached is the
//!   anchor, so `TATAGGGACTATAGGGCCCC...` is cut after position 7.
//! * Paired: the right-most occurrence in the first read is the anchor, so the same
//!   sequence is cut after position 16. The second read of the pair is never changed.
//!
//! ## Paired reads
//! The two inputs must list the same fragments in the same order. The headers of each
//! pair are compared without their leading `@`, and any mismatch stops the run with
//! [`Error::HeaderMismatch`].
//!
//! ## Threads and ordering
//! The input is parsed on one thread, trimmed on [`Settings::threads`] workers and
//! written on one more thread, with bounded queues in between. With more than one
//! worker the output order is not the input order unless [`Settings::ordered`] is set.
//!
//! ## Example
//! ```
//! use anchortrim::*;
//!
//! let input = b"@read6\nACGTTATAGGGACGTACGTACGT\n+\nIIIIIIIIIIIIIIIIIIIIIII\n\
//! @read7\nACGTACGTACGTACGTACGTACGT\n+\nIIIIIIIIIIIIIIIIIIIIIIII\n";
//!
//! let settings = PipelineConfig::default().resolve(Mode::Single)?;
//! let source = iter_fastq1(&input[..], Origin::Stream("input"), settings.max_line_len);
//!
//! let mut out = Vec::new();
//! let written = run_single(source, &mut out, &Adapter::default(), &settings)?;
//!
//! assert_eq!(written, 1);
//! assert_eq!(out, b"@read6\nACGTACGTACGT\n+\nIIIIIIIIIIII\n");
//! # Ok::<(), anchortrim::Error>(())
//! ```

pub mod config;
pub mod errors;
pub mod fastq;
pub mod pipeline;
pub mod read;
pub mod trim;

mod reorder_buffer;

// commonly used functions and types

pub use crate::config::*;
pub use crate::errors::{Error, Result};
pub use crate::fastq::*;
pub use crate::pipeline::*;
pub use crate::read::*;
pub use crate::trim::*;
