//! Go board representation and tactical heuristics.
//!
//! The board is a flattened `(N+1)*(N+2)+1` byte string with an
//! out-of-board border, so that `pt + delta` is a valid cell for all
//! eight neighbor offsets and the hot path never needs edge tests.
//! Stones are stored relative to the side to move: after every move the
//! whole board is swap-cased so the player about to move always owns the
//! `'X'` stones.
//!
//! Modules:
//! - [`board`]: position state, legality, captures, ko, eyes, scoring
//! - [`tactics`]: block/liberty analysis, atari and ladder reading,
//!   common-fate-graph distances
//! - [`coords`]: GTP-style coordinate parsing and board rendering
//! - [`sets`]: the two small-integer set representations the engine
//!   leans on (generation marker, unordered point list)
//! - [`rng`]: the engine's deterministic 32-bit LCG

pub mod board;
pub mod coords;
pub mod rng;
pub mod sets;
pub mod tactics;

pub use board::{
    Point, Position, MoveError, MoveRecord, OwnerMap, BOARDSIZE, BOARD_IMAX, BOARD_IMIN, DELTA,
    EMPTY, MAX_GAME_LEN, N, OTHER, OUT, PASS, TO_PLAY, W,
};
pub use coords::{parse_coord, str_coord};
pub use rng::Lcg32;
pub use sets::{Marker, PointList};
