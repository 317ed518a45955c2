//! Search configuration: validated cell-count range and optional subset
//! selection.
//!
//! Grounded on the teacher's `Config` in `lib/src/config.rs` — a plain
//! struct with chained `#[inline] pub const fn with_*` builder methods and
//! a `check()` that turns cross-field constraints into a [`ConfigError`] —
//! adapted to this crate's fixed-rule, fixed-size-budget search instead of
//! the teacher's rule/transition-table configuration.

use crate::error::ConfigError;

/// Largest cell count representable by the search's fixed-size arrays
/// (`OPEN_CELL_CNT`, `taken_define`, per-bit-count counters), carried over
/// unchanged from `stillcount.c`'s `MAX_ON_CELLS`.
pub const MAX_ON_CELLS: i32 = 64;

/// The largest `max_on_cells` the enumerator will accept — sixteen below
/// `MAX_ON_CELLS` to leave headroom for the undo stack and partition
/// workspace, per `stillcount.c`'s `MAX_BIT_CNT`.
pub const MAX_BIT_CNT: i32 = MAX_ON_CELLS - 16;

/// Once a prefix reaches this many on-cells it is assigned a tag index for
/// subset sharding (`stillcount.c`'s `TAG_SIZE`).
pub const TAG_SIZE: i32 = 9;

/// The subset count used by the repository's precomputed tag-boundary
/// table (`stillcount.c`'s `SELECTED_SEARCH_SUBSETS`).
pub const SELECTED_SEARCH_SUBSETS: u32 = 100;

/// What the enumerator does with a completed still life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Write one LifeHistory-format output file per bit count (and per
    /// strict/pseudo classification).
    #[cfg_attr(feature = "clap", value(name = "w"))]
    Write,
    /// Count only; no output files are produced.
    #[cfg_attr(feature = "clap", value(name = "c"))]
    Count,
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "w" => Ok(Command::Write),
            "c" => Ok(Command::Count),
            other => Err(format!("expected 'w' or 'c', got {other:?}")),
        }
    }
}

/// A validated search configuration: `min_on_cells ..= max_on_cells`, plus
/// an optional `(selected_subset, total_subsets)` restricting the search to
/// one shard of the tag-indexed prefix space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchConfig {
    pub command: Command,
    pub min_on_cells: i32,
    pub max_on_cells: i32,
    pub selected_subset: Option<u32>,
}

impl SearchConfig {
    #[inline]
    pub const fn new(command: Command, min_on_cells: i32, max_on_cells: i32) -> Self {
        Self {
            command,
            min_on_cells,
            max_on_cells,
            selected_subset: None,
        }
    }

    #[inline]
    pub const fn with_selected_subset(mut self, selected_subset: u32) -> Self {
        self.selected_subset = Some(selected_subset);
        self
    }

    #[inline]
    const fn requires_subset_sharding(&self) -> bool {
        self.selected_subset.is_some()
    }

    /// Validate cross-field constraints, mirroring the teacher's
    /// `Config::check` pattern of returning `Self` wrapped in a `Result` so
    /// callers can chain `SearchConfig::new(..).check()?`.
    pub fn check(self) -> Result<Self, ConfigError> {
        if self.min_on_cells < 1 || self.min_on_cells > self.max_on_cells || self.max_on_cells > MAX_BIT_CNT {
            return Err(ConfigError::InvalidBitCountRange);
        }

        if self.max_on_cells > MAX_BIT_CNT {
            return Err(ConfigError::BitCountTooLarge);
        }

        if let Some(subset) = self.selected_subset {
            if subset >= SELECTED_SEARCH_SUBSETS {
                return Err(ConfigError::InvalidSubsetIndex);
            }
            if self.requires_subset_sharding() && self.min_on_cells < TAG_SIZE + 10 {
                return Err(ConfigError::SubsetRangeTooSmall);
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_range_passes_check() {
        let cfg = SearchConfig::new(Command::Count, 4, 16).check();
        assert!(cfg.is_ok());
    }

    #[test]
    fn min_greater_than_max_is_rejected() {
        let err = SearchConfig::new(Command::Count, 10, 4).check().unwrap_err();
        assert_eq!(err, ConfigError::InvalidBitCountRange);
    }

    #[test]
    fn zero_min_is_rejected() {
        let err = SearchConfig::new(Command::Count, 0, 4).check().unwrap_err();
        assert_eq!(err, ConfigError::InvalidBitCountRange);
    }

    #[test]
    fn max_above_bit_cnt_is_rejected() {
        let err = SearchConfig::new(Command::Count, 1, MAX_BIT_CNT + 1).check().unwrap_err();
        assert_eq!(err, ConfigError::InvalidBitCountRange);
    }

    #[test]
    fn subset_below_tag_threshold_is_rejected() {
        let err = SearchConfig::new(Command::Count, 4, 16)
            .with_selected_subset(0)
            .check()
            .unwrap_err();
        assert_eq!(err, ConfigError::SubsetRangeTooSmall);
    }

    #[test]
    fn subset_out_of_range_is_rejected() {
        let err = SearchConfig::new(Command::Count, 20, 30)
            .with_selected_subset(SELECTED_SEARCH_SUBSETS)
            .check()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidSubsetIndex);
    }

    #[test]
    fn subset_with_sufficient_min_passes() {
        let cfg = SearchConfig::new(Command::Write, 20, 30)
            .with_selected_subset(5)
            .check();
        assert!(cfg.is_ok());
    }

    #[test]
    fn command_parses_from_cli_tokens() {
        assert_eq!("w".parse::<Command>(), Ok(Command::Write));
        assert_eq!("c".parse::<Command>(), Ok(Command::Count));
        assert!("x".parse::<Command>().is_err());
    }
}
