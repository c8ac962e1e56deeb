//! Batch processing and file-sequence utilities.

pub mod batch;
pub mod sequence;

// Re-export key types for convenience
pub use batch::{
    collect_inputs, output_path_for, render_batch, render_file, BatchError, BatchSummary,
};
pub use sequence::{find_seq, list_sequence, locate_seq, SequenceEntry, SortOrder, NOT_FOUND};
