use std::ops::Range;

/// Default number of children materialized per step.
pub const DEFAULT_CHUNK_SIZE: usize = 100;
/// Default match count at or below which everything renders eagerly.
pub const DEFAULT_EAGER_THRESHOLD: usize = 2000;
/// Default number of child levels rendered eagerly per materialization pass.
pub const DEFAULT_MAX_EAGER_DEPTH: usize = 3;

/// Decides how many filtered children are materialized at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingPolicy {
    pub chunk_size: usize,
    pub eager_threshold: usize,
    pub max_eager_depth: usize,
}

impl Default for PagingPolicy {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            eager_threshold: DEFAULT_EAGER_THRESHOLD,
            max_eager_depth: DEFAULT_MAX_EAGER_DEPTH,
        }
    }
}

impl PagingPolicy {
    /// Chunking kicks in only above the eager threshold.
    pub fn is_chunking(&self, total_matches: usize) -> bool {
        total_matches > self.eager_threshold
    }

    /// Whether children at `depth` levels below the pass start are deferred
    /// behind a "load more" row.
    pub fn defers_at(&self, depth: usize, total_matches: usize) -> bool {
        self.is_chunking(total_matches) && depth > self.max_eager_depth
    }

    /// Children to materialize next, given `loaded` already on screen.
    pub fn window(&self, loaded: usize, len: usize, total_matches: usize) -> Range<usize> {
        if self.is_chunking(total_matches) {
            self.next_chunk(loaded, len)
        } else {
            loaded.min(len)..len
        }
    }

    /// One chunk starting at `start`, regardless of the threshold.
    pub fn next_chunk(&self, start: usize, len: usize) -> Range<usize> {
        let start = start.min(len);
        start..len.min(start + self.step())
    }

    /// Activations needed to exhaust `len` children when chunking.
    pub fn chunks_for(&self, len: usize) -> usize {
        len.div_ceil(self.step())
    }

    fn step(&self) -> usize {
        self.chunk_size.max(1)
    }
}
