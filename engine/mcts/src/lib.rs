//! Monte-Carlo tree search for the Go engine.
//!
//! The search is the classic loop: descend the tree by RAVE-blended
//! urgency to a leaf, run one heuristic-biased random playout from the
//! leaf's position, and write the result back up the path. Tree nodes
//! are seeded with domain priors (captures, 3x3 patterns, locality,
//! large-pattern probabilities) at expansion, so even unvisited moves
//! start with sensible urgencies.
//!
//! - [`config`]: runtime search parameters with the engine's defaults
//! - [`node`], [`tree`]: arena-allocated tree and per-node statistics
//! - [`playout`]: the biased playout policy and its move generators
//! - [`search`]: the engine context and the search driver

pub mod config;
pub mod node;
pub mod playout;
pub mod search;
pub mod tree;

pub use config::SearchConfig;
pub use node::{NodeId, TreeNode};
pub use playout::{
    choose_from, gen_playout_moves_capture, gen_playout_moves_pat3, gen_playout_moves_random,
    last_moves_neighbors, mcbenchmark, mcplayout, AmafMap, MoveKind,
};
pub use search::{BestMove, Engine};
pub use tree::Tree;
