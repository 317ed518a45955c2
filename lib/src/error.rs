use thiserror::Error;

/// An error that can occur when checking a [`SearchConfig`](crate::config::SearchConfig).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `min_on_cells` or `max_on_cells` is zero, or `min_on_cells > max_on_cells`.
    #[error("min_on_cells and max_on_cells must satisfy 1 <= min <= max <= MAX_BIT_CNT")]
    InvalidBitCountRange,

    /// `max_on_cells` exceeds `MAX_BIT_CNT`.
    #[error("max_on_cells exceeds the maximum supported bit count")]
    BitCountTooLarge,

    /// A subset index was given but is out of range for the selected subset count.
    #[error("selected_subset must be in [0, SELECTED_SEARCH_SUBSETS)")]
    InvalidSubsetIndex,

    /// A subset was requested with `min_on_cells` too small to be sharded safely.
    #[error("subsetting requires min_on_cells >= TAG_SIZE + 10")]
    SubsetRangeTooSmall,
}

/// An error surfaced at the enumerator's outer loop or the file-I/O boundary.
///
/// Low-level grid and list primitives never produce this type: per the error
/// handling design, they report failure as `bool`/`Option` and are expected
/// to be treated as programming errors by their direct caller. This type is
/// reserved for the handful of places spec.md allows process-level failures:
/// argument validation, opening/writing output files, and the CPU-feature
/// check run at startup.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Opening or writing an output file failed.
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The running CPU does not satisfy the build's word-size assumptions.
    #[error("CPU feature mismatch: this build requires 64-bit usize/u64 words")]
    CpuFeatureMismatch,
}
