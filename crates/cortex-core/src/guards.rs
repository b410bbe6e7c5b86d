//! Shared guardrails for scan sizes, render budgets and retrieval windows.

// Discovery guards
pub const MAX_DISCOVER_FILE_BYTES: u64 = 512_000;
pub const READ_SAMPLE_BYTES: usize = 8192;

// Extraction / ranking guards
pub const MAX_SYMBOL_LABELS: usize = 4;
pub const MIN_RANKED_FILES: usize = 1;
pub const MIN_TEXT_BYTES: usize = 256;

// PageRank guards
pub const PAGERANK_DAMPING: f64 = 0.85;
pub const PAGERANK_MAX_ITER: usize = 100;
pub const PAGERANK_TOLERANCE: f64 = 1e-6;
pub const LIBRARY_PAGERANK_MAX_NODES: usize = 512;

// Retrieval guards
pub const DEFAULT_FAILURE_WINDOW: usize = 200;
pub const DEFAULT_CANDIDATE_LIMIT: usize = 80;
pub const MAX_FTS_TERMS: usize = 12;

pub fn clamp_min(value: usize, minimum: usize) -> usize {
    value.max(minimum)
}

/// Clamp a requested ranking size to at least one entry.
pub fn clamp_max_files(value: usize) -> usize {
    clamp_min(value, MIN_RANKED_FILES)
}

/// Clamp a requested render budget to the smallest budget that still fits a
/// truncation note.
pub fn clamp_text_budget(value: usize) -> usize {
    clamp_min(value, MIN_TEXT_BYTES)
}

/// Clamp a retrieval window to `[1, DEFAULT_FAILURE_WINDOW * 10]`.
pub fn clamp_window(value: usize) -> usize {
    value.clamp(1, DEFAULT_FAILURE_WINDOW * 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_text_budget_floors_at_minimum() {
        assert_eq!(clamp_text_budget(10), MIN_TEXT_BYTES);
        assert_eq!(clamp_text_budget(4096), 4096);
    }

    #[test]
    fn test_clamp_max_files_never_zero() {
        assert_eq!(clamp_max_files(0), 1);
        assert_eq!(clamp_max_files(7), 7);
    }

    #[test]
    fn test_clamp_window_bounds() {
        assert_eq!(clamp_window(0), 1);
        assert_eq!(clamp_window(50), 50);
        assert_eq!(clamp_window(1_000_000), DEFAULT_FAILURE_WINDOW * 10);
    }
}
