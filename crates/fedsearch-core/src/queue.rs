use crate::types::{BackendPage, Hit};

/// Snapshot of a queue's backend cursor, taken before dispatching a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueCursor {
    pub last_seen: i64,
    pub total: u64,
}

impl QueueCursor {
    /// True once every match the backend reported has been fetched.
    pub fn is_exhausted(&self) -> bool {
        self.last_seen + 1 >= i64::try_from(self.total).unwrap_or(i64::MAX)
    }

    /// Offset of the next unfetched match.
    pub fn next_offset(&self) -> usize { usize::try_from(self.last_seen + 1).unwrap_or(0) }
}

/// Per-backend buffer of fetched but not yet emitted hits.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultQueue {
    hits: Vec<Hit>,
    total: u64,
    last_seen: i64,
}

impl Default for ResultQueue {
    fn default() -> Self { Self { hits: Vec::new(), total: 0, last_seen: -1 } }
}

impl ResultQueue {
    pub fn new() -> Self { Self::default() }

    pub fn reset(&mut self) { *self = Self::default(); }

    pub fn hits(&self) -> &[Hit] { &self.hits }

    pub fn hits_mut(&mut self) -> &mut [Hit] { &mut self.hits }

    pub fn len(&self) -> usize { self.hits.len() }

    pub fn is_empty(&self) -> bool { self.hits.is_empty() }

    pub fn total(&self) -> u64 { self.total }

    pub fn last_seen(&self) -> i64 { self.last_seen }

    pub fn cursor(&self) -> QueueCursor { QueueCursor { last_seen: self.last_seen, total: self.total } }

    pub fn is_exhausted(&self) -> bool { self.cursor().is_exhausted() }

    /// Append a freshly fetched round behind whatever is still buffered.
    pub fn absorb(&mut self, page: BackendPage) {
        self.last_seen += i64::try_from(page.fetched).unwrap_or(i64::MAX);
        self.total = page.total;
        self.hits.extend(page.hits);
    }

    /// Remove and return the first `pivot` hits, keeping the rest buffered.
    pub fn take_prefix(&mut self, pivot: usize) -> Vec<Hit> {
        let pivot = pivot.min(self.hits.len());
        let rest = self.hits.split_off(pivot);
        std::mem::replace(&mut self.hits, rest)
    }

    pub fn drain_all(&mut self) -> Vec<Hit> { std::mem::take(&mut self.hits) }
}
