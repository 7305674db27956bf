//! The engine context and the MCTS driver.
//!
//! [`Engine`] owns everything the search shares across calls: the
//! configuration, both pattern tables, the RNG, and the precomputed
//! all-points list used when prioring the tree. One `tree_search` call
//! runs the descend / playout / update loop until the simulation budget
//! is exhausted or the early-stop test fires.

use goban::board::{Position, BOARDSIZE, BOARD_IMAX, BOARD_IMIN, EMPTY, OwnerMap, PASS, Point};
use goban::coords::str_coord;
use goban::rng::{shuffle, Lcg32};
use goban::sets::PointList;
use goban::tactics::{compute_cfg_distances, empty_area, fix_atari, line_height};
use patterns::{LargeBoard, LargePatternDict, Pat3Set};
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::node::{NodeId, TreeNode};
use crate::playout::{
    self, gen_playout_moves_capture, gen_playout_moves_pat3, gen_playout_moves_random, AmafMap,
};
use crate::tree::{
    Tree, PRIOR_CAPTURE_MANY, PRIOR_CAPTURE_ONE, PRIOR_CFG, PRIOR_EMPTYAREA, PRIOR_LARGEPATTERN,
    PRIOR_PAT3, PRIOR_SELFATARI,
};

/// What the search wants to do with the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestMove {
    Play(Point),
    Pass,
    Resign,
}

impl BestMove {
    /// GTP spelling of the move.
    pub fn to_gtp(self) -> String {
        match self {
            BestMove::Play(pt) => str_coord(pt),
            BestMove::Pass => "pass".to_string(),
            BestMove::Resign => "resign".to_string(),
        }
    }
}

/// Shared engine state threaded through every search and playout.
pub struct Engine {
    config: SearchConfig,
    pat3: Pat3Set,
    large: LargePatternDict,
    rng: Lcg32,
    allpoints: PointList,
}

impl Engine {
    pub fn new(mut config: SearchConfig, pat3: Pat3Set, large: LargePatternDict, rng: Lcg32) -> Self {
        if !large.is_loaded() && config.expand_visits > 2 {
            // Without pattern priors the tree needs real visits sooner.
            warn!(
                expand_visits = 2,
                "no large-pattern dictionary; lowering expansion threshold"
            );
            config.expand_visits = 2;
        }
        let empty = Position::new();
        let allpoints: PointList = (BOARD_IMIN..BOARD_IMAX)
            .filter(|&pt| empty.color[pt] == EMPTY)
            .collect();
        Self {
            config,
            pat3,
            large,
            rng,
            allpoints,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn pat3(&self) -> &Pat3Set {
        &self.pat3
    }

    pub fn large(&self) -> &LargePatternDict {
        &self.large
    }

    pub fn rng_mut(&mut self) -> &mut Lcg32 {
        &mut self.rng
    }

    /// One playout from `pos`; see [`playout::mcplayout`].
    pub fn playout(
        &mut self,
        pos: &mut Position,
        amaf: &mut AmafMap,
        owner: &mut OwnerMap,
        disp: bool,
    ) -> f64 {
        playout::mcplayout(pos, amaf, owner, &self.config, &self.pat3, &mut self.rng, disp)
    }

    /// Mean score of `n` playouts from the empty board.
    pub fn benchmark(&mut self, n: usize) -> f64 {
        playout::mcbenchmark(n, &self.config, &self.pat3, &mut self.rng)
    }

    /// Capture suggestions over `set`; see
    /// [`playout::gen_playout_moves_capture`].
    pub fn suggest_captures(
        &mut self,
        pos: &Position,
        set: &PointList,
        prob: f32,
        expensive_ok: bool,
        moves: &mut PointList,
        sizes: &mut Vec<usize>,
    ) -> bool {
        gen_playout_moves_capture(pos, set, prob, expensive_ok, &mut self.rng, moves, sizes)
    }

    /// 3x3 pattern suggestions over `set`; see
    /// [`playout::gen_playout_moves_pat3`].
    pub fn suggest_pat3(
        &mut self,
        pos: &Position,
        set: &PointList,
        prob: f32,
        moves: &mut PointList,
    ) -> bool {
        gen_playout_moves_pat3(pos, set, prob, &mut self.rng, &self.pat3, moves)
    }

    /// Add and prior-initialize the children of a leaf.
    pub fn expand(&mut self, tree: &mut Tree, id: NodeId) {
        let parent_pos = tree.get(id).pos.clone();
        let cfg = if parent_pos.last != PASS {
            Some(compute_cfg_distances(&parent_pos, parent_pos.last))
        } else {
            None
        };

        // Candidate children: every empty non-eye point that is legal.
        let mut moves = PointList::new();
        gen_playout_moves_random(&parent_pos, &mut moves, BOARD_IMIN - 1);

        let mut childset = vec![NodeId::NONE; BOARDSIZE];
        let mut children = Vec::with_capacity(moves.len());
        for pt in &moves {
            let mut pos2 = parent_pos.clone();
            if pos2.play(pt).is_err() {
                continue;
            }
            let child = tree.allocate(TreeNode::new(pos2));
            childset[pt] = child;
            children.push(child);
        }

        // Capture and 3x3 suggestions over the whole board.
        let mut cap_moves = PointList::new();
        let mut cap_sizes = Vec::new();
        gen_playout_moves_capture(
            &parent_pos,
            &self.allpoints,
            1.0,
            true,
            &mut self.rng,
            &mut cap_moves,
            &mut cap_sizes,
        );
        for (k, pt) in cap_moves.iter().enumerate() {
            let child_id = childset[pt];
            if child_id.is_none() {
                continue;
            }
            let bonus = if cap_sizes[k] == 1 {
                PRIOR_CAPTURE_ONE
            } else {
                PRIOR_CAPTURE_MANY
            };
            let node = tree.get_mut(child_id);
            node.prior_visits += bonus;
            node.prior_wins += bonus;
        }

        let mut pat_moves = PointList::new();
        gen_playout_moves_pat3(
            &parent_pos,
            &self.allpoints,
            1.0,
            &mut self.rng,
            &self.pat3,
            &mut pat_moves,
        );
        for pt in &pat_moves {
            let child_id = childset[pt];
            if child_id.is_none() {
                continue;
            }
            let node = tree.get_mut(child_id);
            node.prior_visits += PRIOR_PAT3;
            node.prior_wins += PRIOR_PAT3;
        }

        // Per-child priors: locality, board line, self-atari, patterns.
        let board = LargeBoard::from_position(&parent_pos);
        let mut escapes = PointList::new();
        let mut escape_sizes = Vec::new();
        for &child_id in &children {
            let pt = tree.get(child_id).pos.last;
            let mut pv = 0u32;
            let mut pw = 0u32;

            if let Some(cfg) = &cfg {
                let d = cfg[pt];
                if d >= 1 && d as usize <= PRIOR_CFG.len() {
                    pv += PRIOR_CFG[d as usize - 1];
                    pw += PRIOR_CFG[d as usize - 1];
                }
            }

            let height = line_height(pt);
            if height <= 2 && empty_area(&parent_pos, pt, 3) {
                // Nothing around: low lines are bad, the third line is
                // good. Sanitizes the opening and invasions.
                if height <= 1 {
                    pv += PRIOR_EMPTYAREA;
                }
                if height == 2 {
                    pv += PRIOR_EMPTYAREA;
                    pw += PRIOR_EMPTYAREA;
                }
            }

            let child_pos = tree.get(child_id).pos.clone();
            fix_atari(&child_pos, pt, true, true, false, &mut escapes, &mut escape_sizes);
            if !escapes.is_empty() {
                pv += PRIOR_SELFATARI;
            }

            let patternprob = self.large.probability(&board, pt);
            if patternprob > 0.0 {
                let pattern_prior = patternprob.sqrt();
                pv += (pattern_prior * PRIOR_LARGEPATTERN) as u32;
                pw += (pattern_prior * PRIOR_LARGEPATTERN) as u32;
            }

            let node = tree.get_mut(child_id);
            node.prior_visits += pv;
            node.prior_wins += pw;
        }

        if children.is_empty() {
            let mut pos2 = parent_pos.clone();
            pos2.pass();
            children.push(tree.allocate(TreeNode::new(pos2)));
        }
        tree.get_mut(id).children = children;
    }

    /// Walk from the root to a leaf, following maximum urgency, and
    /// record the path. Leaves that have earned enough visits get
    /// expanded in passing so the walk can continue one step deeper.
    fn descend(&mut self, tree: &mut Tree, amaf: &mut AmafMap, path: &mut Vec<NodeId>) {
        path.clear();
        path.push(tree.root());
        let mut passes = 0;
        loop {
            let current = *path.last().unwrap();
            if !tree.get(current).is_expanded() || passes >= 2 {
                break;
            }

            // Shuffle first so ties break randomly, then take the most
            // urgent child.
            let mut children = std::mem::take(&mut tree.get_mut(current).children);
            shuffle(&mut children, &mut self.rng);
            let mut chosen = children[0];
            let mut umax = 0.0;
            for &c in &children {
                let u = tree.get(c).rave_urgency(self.config.rave_equiv);
                if u > umax {
                    umax = u;
                    chosen = c;
                }
            }
            tree.get_mut(current).children = children;

            path.push(chosen);
            let mv = tree.get(chosen).pos.last;
            if mv == PASS {
                passes += 1;
            } else {
                passes = 0;
                if amaf[mv] == 0 {
                    amaf[mv] = if tree.get(current).pos.n % 2 == 0 { 1 } else { -1 };
                }
            }

            if !tree.get(chosen).is_expanded()
                && tree.get(chosen).visits >= self.config.expand_visits
            {
                self.expand(tree, chosen);
            }
        }
    }

    /// Run the search loop on `tree` and pick a reply.
    ///
    /// Stops early once the best move's winrate is overwhelming (95%
    /// after 5% of the budget, 80% after 20%). Resigns below the resign
    /// threshold; passes when the game has ended with two passes.
    pub fn tree_search(&mut self, tree: &mut Tree, owner: &mut OwnerMap) -> BestMove {
        if !tree.get(tree.root()).is_expanded() {
            self.expand(tree, tree.root());
        }
        owner.fill(0);

        let n = self.config.n_sims;
        let mut path: Vec<NodeId> = Vec::with_capacity(BOARDSIZE);
        let mut i = 0;
        while i < n {
            let mut amaf: AmafMap = [0; BOARDSIZE];
            if i > 0 && i % self.config.report_period == 0 {
                debug!("{}", tree.summary(i));
            }
            self.descend(tree, &mut amaf, &mut path);
            let leaf = *path.last().unwrap();
            let mut pos = tree.get(leaf).pos.clone();
            let score = playout::mcplayout(
                &mut pos,
                &mut amaf,
                owner,
                &self.config,
                &self.pat3,
                &mut self.rng,
                false,
            );
            tree.update(&path, &amaf, score);
            i += 1;

            let best_wr = tree
                .best_move(tree.root(), &[])
                .map(|b| tree.get(b).winrate())
                .unwrap_or(-0.1);
            if (i as f64 > n as f64 * 0.05 && best_wr > self.config.fastplay5_threshold)
                || (i as f64 > n as f64 * 0.2 && best_wr > self.config.fastplay20_threshold)
            {
                debug!(sims = i, winrate = best_wr, "early stop");
                break;
            }
        }
        debug!("{}", tree.summary(i));

        let Some(best) = tree.best_move(tree.root(), &[]) else {
            return BestMove::Pass;
        };
        let best_node = tree.get(best);
        if best_node.winrate() < self.config.resign_threshold {
            return BestMove::Resign;
        }
        if best_node.pos.last == PASS && best_node.pos.last2 == PASS {
            return BestMove::Pass;
        }
        BestMove::Play(best_node.pos.last)
    }

    /// Search a fresh tree rooted at `pos`.
    pub fn genmove(&mut self, pos: &Position, owner: &mut OwnerMap) -> BestMove {
        let mut tree = Tree::new(pos.clone());
        self.tree_search(&mut tree, owner)
    }
}
