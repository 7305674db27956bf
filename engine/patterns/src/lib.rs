//! Pattern matching for move generation.
//!
//! Two pattern systems feed the playout policy and the tree priors:
//!
//! - [`pat3`]: a handful of hand-written 3x3 shapes, compiled once into a
//!   65536-bit membership set keyed by the board's cached 16-bit
//!   neighborhood code. Matching is a single bit test on the hot path.
//! - [`large`]: a dictionary of larger "gridcular" shapes keyed by 64-bit
//!   Zobrist signatures over twelve concentric neighborhoods, loaded from
//!   the `patterns.prob` / `patterns.spat` text files and yielding a move
//!   probability used to seed tree priors.

pub mod large;
pub mod pat3;

pub use large::{LargeBoard, LargePatternDict, PatternLoadError};
pub use pat3::Pat3Set;
