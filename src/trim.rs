use memchr::memmem::FinderRev;

use crate::read::*;

/// Adapter motif removed from the start of reads.
pub const ADAPTER_MOTIF: &[u8] = b"TATAGGG";
/// Number of leading bases searched for the adapter motif.
pub const WINDOW_LEN: usize = 20;

/// The adapter motif together with the leading window it is searched in.
///
/// An occurrence only counts if it lies entirely inside the window. Reads shorter
/// than the window never match.
#[derive(Clone, Debug)]
pub struct Adapter {
    finder: FinderRev<'static>,
    window: usize,
}

impl Default for Adapter {
    fn default() -> Self {
        Self::new(ADAPTER_MOTIF, WINDOW_LEN)
    }
}

impl Adapter {
    pub fn new(motif: &[u8], window: usize) -> Self {
        assert!(!motif.is_empty(), "Adapter motif must not be empty");
        Self {
            finder: FinderRev::new(motif).into_owned(),
            window,
        }
    }

    pub fn motif(&self) -> &[u8] {
        self.finder.needle()
    }

    pub fn motif_len(&self) -> usize {
        self.finder.needle().len()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    fn leading_window<'a>(&self, seq: &'a [u8]) -> Option<&'a [u8]> {
        seq.get(..self.window)
    }
}

/// Anchor used for single-end reads.
///
/// Starts from the right-most occurrence of the motif in the leading window, then keeps
/// searching the bases strictly before the current occurrence until no earlier one is
/// left. Occurrences overlapping the current one are not visited.
pub fn single_end_anchor(seq: &[u8], adapter: &Adapter) -> Option<usize> {
    let window = adapter.leading_window(seq)?;
    let mut anchor = adapter.finder.rfind(window)?;

    while let Some(earlier) = adapter.finder.rfind(&window[..anchor]) {
        anchor = earlier;
    }

    Some(anchor)
}

/// Anchor used for the first read of a pair: the right-most occurrence of the motif in
/// the leading window.
pub fn paired_end_anchor(seq: &[u8], adapter: &Adapter) -> Option<usize> {
    let window = adapter.leading_window(seq)?;
    adapter.finder.rfind(window)
}

/// Cut a single-end read just past its anchor, or drop it if there is none.
pub fn trim_single(mut record: Record, adapter: &Adapter) -> Option<Record> {
    let anchor = single_end_anchor(record.seq(), adapter)?;
    record.trim_front(anchor + adapter.motif_len());
    Some(record)
}

/// Cut the first read of a pair just past its right-most anchor, or drop the pair if
/// there is none. The second read is never changed.
pub fn trim_paired(pair: RecordPair, adapter: &Adapter) -> Option<RecordPair> {
    let RecordPair { mut r1, r2 } = pair;
    let anchor = paired_end_anchor(r1.seq(), adapter)?;
    r1.trim_front(anchor + adapter.motif_len());
    Some(RecordPair::new(r1, r2))
}
