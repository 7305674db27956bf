//! Tactical reading: blocks, liberties, atari rescue/capture analysis,
//! one-step ladder reading, and common-fate-graph distances.
//!
//! `read_ladder_attack` and `fix_atari` call each other recursively; the
//! recursion is bounded because every level fills a liberty on a copied
//! board.

use std::collections::VecDeque;

use crate::board::{Point, Position, BOARDSIZE, DELTA, EMPTY, N, OTHER, OUT, PASS, TO_PLAY};
use crate::sets::{Marker, PointList};

/// Compute the block at `pt`: all its stones and its distinct liberties.
///
/// The search returns as soon as `nlibs` liberties have been found, so
/// callers that only need to distinguish "in atari" from "not" pass 1 or
/// 2 and skip most of the flood. `stones` may be truncated on early
/// exit.
pub fn compute_block(
    pos: &Position,
    pt: Point,
    stones: &mut PointList,
    libs: &mut PointList,
    nlibs: usize,
) {
    let color = pos.color[pt];
    let mut seen = Marker::new();
    stones.clear();
    libs.clear();
    stones.push(pt);
    seen.mark(pt);
    let mut tail = 0;
    'flood: while tail < stones.len() {
        let p = stones.as_slice()[tail];
        tail += 1;
        for k in 0..4 {
            let nb = (p as isize + DELTA[k]) as usize;
            if seen.is_marked(nb) {
                continue;
            }
            seen.mark(nb);
            if pos.color[nb] == color {
                stones.push(nb);
            } else if pos.color[nb] == EMPTY {
                libs.push(nb);
                if libs.len() >= nlibs {
                    break 'flood;
                }
            }
        }
    }
}

/// Collect the liberties of every opposing block in atari that touches
/// one of `stones`.
fn neighbor_blocks_in_atari(pos: &Position, stones: &PointList, libs_out: &mut PointList) {
    let own = pos.color[stones.as_slice()[0]];
    let enemy = if own == OTHER { TO_PLAY } else { OTHER };

    let mut visited = Marker::new();
    let mut block = PointList::new();
    let mut block_libs = PointList::new();
    libs_out.clear();
    for pt in stones {
        for k in 0..4 {
            let nb = (pt as isize + DELTA[k]) as usize;
            if pos.color[nb] == enemy && !visited.is_marked(nb) {
                compute_block(pos, nb, &mut block, &mut block_libs, 2);
                if block_libs.len() == 1 {
                    libs_out.push(block_libs.as_slice()[0]);
                    for s in &block {
                        visited.mark(s);
                    }
                }
            }
        }
    }
}

/// Line number above the nearest edge, 0-based (0 = first line).
pub fn line_height(pt: Point) -> usize {
    let mut row = pt / (N + 1);
    let mut col = pt % (N + 1);
    if row > N / 2 {
        row = N + 1 - row;
    }
    if col > N / 2 {
        col = N + 1 - col;
    }
    row.min(col) - 1
}

/// True if no stone sits within Manhattan distance `dist` of `pt`.
pub fn empty_area(pos: &Position, pt: Point, dist: usize) -> bool {
    for k in 0..4 {
        let nb = (pt as isize + DELTA[k]) as usize;
        let c = pos.color[nb];
        if c == TO_PLAY || c == OTHER {
            return false;
        }
        if c == EMPTY && dist > 1 && !empty_area(pos, nb, dist - 1) {
            return false;
        }
    }
    true
}

/// Check whether a two-liberty block at `pt` can be pulled into a
/// working ladder. Expects the block's two liberties in `libs`; returns
/// the attacking move that continues the ladder, or [`PASS`].
///
/// This is really a general 2-liberty capture solver: try each liberty,
/// then ask `fix_atari` (with the two-liberty test off, one-move
/// horizon) whether the block still has an out.
pub fn read_ladder_attack(pos: &Position, pt: Point, libs: &[Point]) -> Point {
    let mut attack = PASS;
    let mut moves = PointList::new();
    let mut sizes = Vec::new();
    for &l in libs {
        let mut probe = pos.clone();
        if probe.play(l).is_err() {
            continue;
        }
        let in_atari = fix_atari(&probe, pt, false, false, false, &mut moves, &mut sizes);
        if in_atari && moves.is_empty() {
            attack = l;
        }
    }
    attack
}

/// Atari and capture analysis for the block at `pt`.
///
/// Returns true when the block is in atari. `moves` receives candidate
/// moves that capture the block (if it is the opponent's) or save it
/// (if it is ours): counter-captures of neighboring blocks in atari,
/// and the block's own liberty when playing it actually escapes rather
/// than feeding a ladder. `sizes` parallels `moves` with block sizes.
///
/// `singlept_ok` suppresses rescue analysis of lone stones. With
/// `twolib_test`, blocks on exactly two liberties are probed for a
/// working ladder and the ladder continuation is reported as a capture
/// threat; `twolib_edgeonly` restricts that (expensive) probe to blocks
/// whose liberties both sit on the first line.
pub fn fix_atari(
    pos: &Position,
    pt: Point,
    singlept_ok: bool,
    twolib_test: bool,
    twolib_edgeonly: bool,
    moves: &mut PointList,
    sizes: &mut Vec<usize>,
) -> bool {
    const MAXLIBS: usize = 3;
    moves.clear();
    sizes.clear();

    let mut stones = PointList::new();
    let mut libs = PointList::new();
    compute_block(pos, pt, &mut stones, &mut libs, MAXLIBS);
    if singlept_ok && stones.len() == 1 {
        return false;
    }
    if libs.len() >= 2 {
        if twolib_test && libs.len() == 2 && stones.len() > 1 {
            if twolib_edgeonly
                && (line_height(libs.as_slice()[0]) > 0 || line_height(libs.as_slice()[1]) > 0)
            {
                // Liberties away from the edge: skip the ladder read.
                return false;
            }
            let ladder_attack = read_ladder_attack(pos, pt, libs.as_slice());
            if ladder_attack != PASS && moves.insert(ladder_attack) {
                sizes.push(stones.len());
            }
        }
        return false;
    }

    let lib = libs.as_slice()[0];
    if pos.color[pt] == OTHER {
        // Opponent block on one liberty: taking the liberty captures it.
        if moves.insert(lib) {
            sizes.push(stones.len());
        }
        return true;
    }

    // Our block is in atari. Counter-capturing a neighbor may save it.
    let mut counter_libs = PointList::new();
    neighbor_blocks_in_atari(pos, &stones, &mut counter_libs);
    for l in &counter_libs {
        if moves.insert(l) {
            sizes.push(stones.len());
        }
    }

    // Escape: does filling our last liberty gain at least two liberties?
    let mut escape = pos.clone();
    if escape.play(lib).is_err() {
        return true; // the "escape" is suicidal
    }
    let mut esc_stones = PointList::new();
    let mut esc_libs = PointList::new();
    compute_block(&escape, lib, &mut esc_stones, &mut esc_libs, MAXLIBS);
    if esc_libs.len() >= 2 {
        // With exactly two liberties left, make sure the run does not
        // feed a ladder; with alternative moves on hand we do not care.
        if moves.len() > 1
            || esc_libs.len() >= 3
            || read_ladder_attack(&escape, lib, esc_libs.as_slice()) == PASS
        {
            if moves.insert(lib) {
                sizes.push(esc_stones.len());
            }
        }
    }
    true
}

/// Board map of common-fate-graph distances from `src`: moving within a
/// same-color block is free, every other step costs one. Unreached (and
/// off-board) points stay at -1.
pub fn compute_cfg_distances(pos: &Position, src: Point) -> [i32; BOARDSIZE] {
    let mut cfg = [-1i32; BOARDSIZE];
    cfg[src] = 0;
    let mut fringe = VecDeque::with_capacity(BOARDSIZE);
    fringe.push_back(src);
    while let Some(p) = fringe.pop_front() {
        for k in 0..4 {
            let nb = (p as isize + DELTA[k]) as usize;
            let c = pos.color[nb];
            if c == OUT {
                continue;
            }
            if cfg[nb] >= 0 && cfg[nb] <= cfg[p] {
                continue;
            }
            let before = cfg[nb];
            cfg[nb] = if c != EMPTY && c == pos.color[p] {
                cfg[p]
            } else {
                cfg[p] + 1
            };
            if before < 0 || before > cfg[nb] {
                fringe.push_back(nb);
            }
        }
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::parse_coord;

    fn pt(s: &str) -> Point {
        parse_coord(s).unwrap()
    }

    fn setup(moves: &[&str]) -> Position {
        let mut pos = Position::new();
        for m in moves {
            let p = pt(m);
            if p == PASS {
                pos.pass();
            } else {
                pos.play(p).unwrap_or_else(|e| panic!("setup move {m}: {e}"));
            }
        }
        pos
    }

    #[test]
    fn test_compute_block_single_stone() {
        let pos = setup(&["D4"]);
        let mut stones = PointList::new();
        let mut libs = PointList::new();
        compute_block(&pos, pt("D4"), &mut stones, &mut libs, 8);
        assert_eq!(stones.len(), 1);
        assert_eq!(libs.len(), 4);
    }

    #[test]
    fn test_compute_block_early_exit() {
        let pos = setup(&["D4"]);
        let mut stones = PointList::new();
        let mut libs = PointList::new();
        compute_block(&pos, pt("D4"), &mut stones, &mut libs, 2);
        assert_eq!(libs.len(), 2);
    }

    #[test]
    fn test_compute_block_connected() {
        let pos = setup(&["D4", "A1", "D5", "A2", "E4"]);
        let mut stones = PointList::new();
        let mut libs = PointList::new();
        compute_block(&pos, pt("D4"), &mut stones, &mut libs, BOARDSIZE);
        assert_eq!(stones.len(), 3);
        // D4-D5-E4 bent three: 7 distinct liberties.
        assert_eq!(libs.len(), 7);
    }

    #[test]
    fn test_line_height() {
        assert_eq!(line_height(pt("A1")), 0);
        assert_eq!(line_height(pt("B2")), 1);
        assert_eq!(line_height(pt("C3")), 2);
        assert_eq!(line_height(pt("G7")), 6);
        assert_eq!(line_height(pt("N13")), 0);
    }

    #[test]
    fn test_empty_area() {
        let pos = setup(&["D4"]);
        assert!(!empty_area(&pos, pt("D5"), 1));
        assert!(!empty_area(&pos, pt("D6"), 3));
        assert!(empty_area(&pos, pt("K10"), 3));
    }

    #[test]
    fn test_cfg_contracts_blocks() {
        // One Black chain D4-D5-D6 and a far White stone.
        let pos = setup(&["D4", "K10", "D5", "K11", "D6"]);
        let cfg = compute_cfg_distances(&pos, pt("D4"));
        assert_eq!(cfg[pt("D4")], 0);
        assert_eq!(cfg[pt("D5")], 0, "same block is distance 0");
        assert_eq!(cfg[pt("D6")], 0);
        assert_eq!(cfg[pt("E4")], 1);
        assert_eq!(cfg[pt("E6")], 1, "adjacent to contracted block");
        assert_eq!(cfg[pt("F6")], 2);
    }

    #[test]
    fn test_cfg_ignores_out() {
        let pos = setup(&["A1"]);
        let cfg = compute_cfg_distances(&pos, pt("A1"));
        assert_eq!(cfg[0], -1);
    }

    #[test]
    fn test_fix_atari_capture_opponent() {
        // White A1 sits on one liberty with Black to move: the liberty
        // itself is the capture.
        let pos = setup(&["B1", "A1", "E5", "G5"]);
        let mut moves = PointList::new();
        let mut sizes = Vec::new();
        let in_atari = fix_atari(&pos, pt("A1"), false, true, false, &mut moves, &mut sizes);
        assert!(in_atari);
        assert_eq!(moves.as_slice(), &[pt("A2")]);
        assert_eq!(sizes, vec![1]);
    }

    #[test]
    fn test_fix_atari_single_point_ok_skips() {
        let pos = setup(&["A1", "A2"]);
        let mut moves = PointList::new();
        let mut sizes = Vec::new();
        let in_atari = fix_atari(&pos, pt("A1"), true, true, false, &mut moves, &mut sizes);
        assert!(!in_atari, "singlept_ok must report lone stones as not in atari");
        assert!(moves.is_empty());
    }
}
