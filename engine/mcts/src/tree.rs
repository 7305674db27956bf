//! Arena-allocated search tree.
//!
//! Nodes live in one contiguous `Vec` and refer to each other by
//! [`NodeId`], so freeing the tree after a genmove is a single arena
//! drop and traversal stays cache-friendly.

use goban::board::{Point, Position, PASS};
use goban::coords::str_coord;

use crate::node::{NodeId, TreeNode};
use crate::playout::AmafMap;

/// Even prior: every fresh node starts as if it had been visited this
/// many times winning half of them.
pub const PRIOR_EVEN: u32 = 10;
/// Negative prior for moves that put their own block in danger.
pub const PRIOR_SELFATARI: u32 = 10;
pub const PRIOR_CAPTURE_ONE: u32 = 15;
pub const PRIOR_CAPTURE_MANY: u32 = 30;
pub const PRIOR_PAT3: u32 = 10;
/// Scale for large-pattern probabilities (most are small, hence sqrt).
pub const PRIOR_LARGEPATTERN: f64 = 100.0;
/// Priors for moves at common-fate-graph distance 1, 2, 3 from the
/// last move.
pub const PRIOR_CFG: [u32; 3] = [24, 22, 8];
pub const PRIOR_EMPTYAREA: u32 = 10;

/// Search tree over an arena of nodes.
pub struct Tree {
    nodes: Vec<TreeNode>,
    root: NodeId,
}

impl Tree {
    /// New tree rooted at `pos`.
    pub fn new(pos: Position) -> Self {
        Self {
            nodes: vec![TreeNode::new(pos)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn allocate(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Most-visited child of `id`, skipping anything in `except`.
    pub fn best_move(&self, id: NodeId, except: &[NodeId]) -> Option<NodeId> {
        self.get(id)
            .children
            .iter()
            .copied()
            .filter(|c| !except.contains(c))
            .max_by_key(|&c| self.get(c).visits)
    }

    /// Write one simulation result into every node on `path`
    /// (leaf last).
    ///
    /// `score` is from the perspective of the side to move at the leaf;
    /// node statistics are from the perspective of the side that just
    /// moved, so a node scores a win when the score is negative, and the
    /// sign flips at each step up. Children of path nodes whose move was
    /// played first by the matching color in the playout collect AMAF
    /// credit.
    pub fn update(&mut self, path: &[NodeId], amaf: &AmafMap, mut score: f64) {
        for &id in path.iter().rev() {
            {
                let node = self.get_mut(id);
                node.visits += 1;
                if score < 0.0 {
                    node.wins += 1;
                }
            }
            let amaf_value: i8 = if self.get(id).pos.n % 2 == 0 { 1 } else { -1 };
            for k in 0..self.get(id).children.len() {
                let child_id = self.get(id).children[k];
                let last: Point = self.get(child_id).pos.last;
                if last == PASS {
                    continue;
                }
                if amaf[last] == amaf_value {
                    let child = self.get_mut(child_id);
                    if score > 0.0 {
                        child.rave_wins += 1;
                    }
                    child.rave_visits += 1;
                }
            }
            score = -score;
        }
    }

    /// One-line progress summary: the principal variation by visit
    /// count, plus the top candidate moves with winrates.
    pub fn summary(&self, sims: usize) -> String {
        use std::fmt::Write;

        let mut candidates = String::new();
        let mut except: Vec<NodeId> = Vec::with_capacity(5);
        for _ in 0..5 {
            let Some(best) = self.best_move(self.root, &except) else {
                break;
            };
            let node = self.get(best);
            if node.visits > 0 {
                write!(
                    candidates,
                    " {}({:.3})",
                    str_coord(node.pos.last),
                    node.winrate()
                )
                .unwrap();
            } else {
                write!(candidates, " {}(nan)", str_coord(node.pos.last)).unwrap();
            }
            except.push(best);
        }

        let mut seq = String::new();
        let mut id = self.root;
        for _ in 0..5 {
            match self.best_move(id, &[]) {
                Some(next) => {
                    write!(seq, "{} ", str_coord(self.get(next).pos.last)).unwrap();
                    id = next;
                }
                None => break,
            }
        }

        let best_wr = self
            .best_move(self.root, &[])
            .map(|b| self.get(b).winrate())
            .unwrap_or(-0.1);
        format!("[{sims:4}] winrate {best_wr:.3} | seq {seq}| can{candidates}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goban::board::BOARDSIZE;
    use goban::coords::parse_coord;

    fn child_of(tree: &mut Tree, parent: NodeId, mv: &str) -> NodeId {
        let mut pos = tree.get(parent).pos.clone();
        pos.play(parse_coord(mv).unwrap()).unwrap();
        let id = tree.allocate(TreeNode::new(pos));
        tree.get_mut(parent).children.push(id);
        id
    }

    #[test]
    fn test_new_tree_has_root() {
        let tree = Tree::new(Position::new());
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_empty());
        assert!(!tree.get(tree.root()).is_expanded());
    }

    #[test]
    fn test_best_move_by_visits_with_exclusion() {
        let mut tree = Tree::new(Position::new());
        let root = tree.root();
        let a = child_of(&mut tree, root, "D4");
        let root = tree.root();
        let b = child_of(&mut tree, root, "E5");
        tree.get_mut(a).visits = 10;
        tree.get_mut(b).visits = 4;
        assert_eq!(tree.best_move(tree.root(), &[]), Some(a));
        assert_eq!(tree.best_move(tree.root(), &[a]), Some(b));
        assert_eq!(tree.best_move(tree.root(), &[a, b]), None);
    }

    #[test]
    fn test_update_counts_and_negates() {
        let mut tree = Tree::new(Position::new());
        let root = tree.root();
        let child = child_of(&mut tree, root, "D4");
        let amaf: AmafMap = [0; BOARDSIZE];

        // Score +1 for the side to move at the leaf: the leaf's
        // just-moved side lost, the root's gains a win.
        tree.update(&[root, child], &amaf, 1.0);
        assert_eq!(tree.get(child).visits, 1);
        assert_eq!(tree.get(child).wins, 0);
        assert_eq!(tree.get(root).visits, 1);
        assert_eq!(tree.get(root).wins, 1);
    }

    #[test]
    fn test_update_credits_amaf_children() {
        let mut tree = Tree::new(Position::new());
        let root = tree.root();
        let d4 = child_of(&mut tree, root, "D4");
        let e5 = child_of(&mut tree, root, "E5");
        let mut amaf: AmafMap = [0; BOARDSIZE];
        // Black (the mover at the root) played D4 first in the playout.
        amaf[parse_coord("D4").unwrap()] = 1;

        tree.update(&[root], &amaf, 1.0);
        assert_eq!(tree.get(d4).rave_visits, 1);
        assert_eq!(tree.get(d4).rave_wins, 1);
        assert_eq!(tree.get(e5).rave_visits, 0);
    }

    #[test]
    fn test_summary_mentions_best_candidate() {
        let mut tree = Tree::new(Position::new());
        let root = tree.root();
        let a = child_of(&mut tree, root, "D4");
        tree.get_mut(a).visits = 3;
        tree.get_mut(a).wins = 2;
        let line = tree.summary(42);
        assert!(line.contains("D4"), "summary should name the move: {line}");
        assert!(line.contains("[  42]"));
    }
}
