//! Bit-packed Life grid engine and backtracking still-life enumerator.
#![warn(clippy::missing_const_for_fn)]

pub mod canonical;
pub mod cell_list;
pub mod config;
pub mod error;
pub mod glider;
pub mod grid;
pub mod random_array;
pub mod rect;
pub mod rle;
pub mod search;

pub use canonical::make_canonical;
pub use cell_list::{Cell, ObjCellList};
pub use config::{Command, SearchConfig, MAX_BIT_CNT, MAX_ON_CELLS, TAG_SIZE};
pub use error::{ConfigError, SearchError};
pub use glider::{Direction, Glider};
pub use grid::GoLGrid;
pub use random_array::{RandomDataArray, RandomSeed};
pub use rect::Rect;
pub use rle::{format_cell_list, format_life_history_body};
pub use search::{Classification, SearchState, SolutionSink};
