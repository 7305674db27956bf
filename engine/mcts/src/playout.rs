//! Heuristic-biased random playouts.
//!
//! A playout tries cheap move sources in order of preference — capture
//! suggestions around the last two moves, then 3x3 pattern matches,
//! then a random board scan — each consulted with less than full
//! probability, putting the policy somewhere between rule-based and
//! probability-distribution playouts. Chosen moves that turn out to be
//! self-ataris are usually taken back and the scan continues.

use goban::board::{
    OwnerMap, Point, Position, BOARDSIZE, BOARD_IMAX, BOARD_IMIN, DELTA, EMPTY, MAX_GAME_LEN, N,
    OTHER, OUT, PASS, TO_PLAY, W,
};
use goban::coords::{render, str_coord};
use goban::rng::Lcg32;
use goban::sets::PointList;
use goban::tactics::fix_atari;
use patterns::Pat3Set;
use tracing::{debug, trace};

use crate::config::SearchConfig;

/// Who played a point first during one playout: +1 Black, -1 White,
/// 0 nobody.
pub type AmafMap = [i8; BOARDSIZE];

/// Source a playout move came from; sets the self-atari rejection rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Capture,
    Pat3,
    Random,
}

/// Shuffled list of `pt` and its eight on-board neighbors.
fn neighbors_of(pos: &Position, pt: Point, rng: &mut Lcg32) -> PointList {
    let mut points = PointList::with_capacity(9);
    if pt == PASS {
        return points;
    }
    points.push(pt);
    for d in DELTA {
        let nb = (pt as isize + d) as usize;
        if pos.color[nb] != OUT {
            points.push(nb);
        }
    }
    points.shuffle(rng);
    points
}

/// Shuffled, deduplicated neighborhood of the last two moves, the last
/// move's surroundings taking priority.
pub fn last_moves_neighbors(pos: &Position, rng: &mut Lcg32) -> PointList {
    let mut points = neighbors_of(pos, pos.last, rng);
    for nb in &neighbors_of(pos, pos.last2, rng) {
        points.insert(nb);
    }
    points
}

/// Capture-or-save candidates over `heuristic_set`, most urgent blocks
/// first encountered. Consulted only with probability `prob`; with
/// `expensive_ok` the two-liberty ladder reads run everywhere, not just
/// on the edge. Returns true if any candidate was produced.
pub fn gen_playout_moves_capture(
    pos: &Position,
    heuristic_set: &PointList,
    prob: f32,
    expensive_ok: bool,
    rng: &mut Lcg32,
    moves: &mut PointList,
    sizes: &mut Vec<usize>,
) -> bool {
    moves.clear();
    sizes.clear();
    if (rng.below(1000) as f32) > prob * 1000.0 {
        return false;
    }
    let twolib_edgeonly = !expensive_ok;
    let mut block_moves = PointList::new();
    let mut block_sizes = Vec::new();
    for pt in heuristic_set {
        if pos.color[pt] != TO_PLAY && pos.color[pt] != OTHER {
            continue;
        }
        fix_atari(
            pos,
            pt,
            false,
            true,
            twolib_edgeonly,
            &mut block_moves,
            &mut block_sizes,
        );
        for (k, mv) in block_moves.iter().enumerate() {
            if moves.insert(mv) {
                sizes.push(block_sizes[k]);
            }
        }
    }
    !moves.is_empty()
}

/// Empty points of `heuristic_set` that match a 3x3 pattern. Consulted
/// only with probability `prob`.
pub fn gen_playout_moves_pat3(
    pos: &Position,
    heuristic_set: &PointList,
    prob: f32,
    rng: &mut Lcg32,
    pat3: &Pat3Set,
    moves: &mut PointList,
) -> bool {
    moves.clear();
    if (rng.below(1000) as f32) > prob * 1000.0 {
        return false;
    }
    for pt in heuristic_set {
        if pos.color[pt] == EMPTY && pat3.matches(pos, pt) {
            moves.push(pt);
        }
    }
    !moves.is_empty()
}

/// Every empty point that is not one of our own true eyes, scanning the
/// board from `start` and wrapping around. May include suicides; the
/// caller filters by actually playing.
pub fn gen_playout_moves_random(pos: &Position, moves: &mut PointList, start: Point) {
    moves.clear();
    for pt in start..BOARD_IMAX {
        if pos.color[pt] == EMPTY && pos.is_eye(pt) != TO_PLAY {
            moves.push(pt);
        }
    }
    for pt in BOARD_IMIN - 1..start {
        if pos.color[pt] == EMPTY && pos.is_eye(pt) != TO_PLAY {
            moves.push(pt);
        }
    }
}

/// Play the first workable candidate from `moves` on `pos` and return
/// it, or [`PASS`] if none sticks.
///
/// Illegal candidates are skipped. A legal candidate that `fix_atari`
/// flags as a self-atari is taken back with probability depending on
/// `kind` (random moves are rejected more leniently so nakade throw-ins
/// survive). The take-back leans on single-move undo, so it is skipped
/// for multi-stone captures, which cannot be self-ataris worth undoing.
pub fn choose_from(
    pos: &mut Position,
    moves: &PointList,
    kind: MoveKind,
    rng: &mut Lcg32,
    config: &SearchConfig,
) -> Point {
    let reject_prob = match kind {
        MoveKind::Random => config.prob_self_atari_reject_random,
        _ => config.prob_self_atari_reject_suggested,
    };
    let mut escapes = PointList::new();
    let mut sizes = Vec::new();
    for pt in moves {
        let rec = match pos.play(pt) {
            Ok(rec) => rec,
            Err(_) => continue,
        };
        if kind != MoveKind::Random {
            trace!(kind = ?kind, mv = %str_coord(pt), "move suggestion");
        }
        let roll = rng.below(10_000);
        if rec.captured <= 1 && (roll as f64) <= 10_000.0 * reject_prob {
            fix_atari(pos, pt, true, true, true, &mut escapes, &mut sizes);
            if !escapes.is_empty() {
                trace!(mv = %str_coord(pt), "rejecting self-atari move");
                pos.undo(&rec);
                continue;
            }
        }
        return pt;
    }
    PASS
}

/// One Monte-Carlo playout from `pos` to the end of the game.
///
/// Returns the score from the perspective of the side to move at entry.
/// `amaf` records who played each point first; `owner` accumulates the
/// final territory attribution.
pub fn mcplayout(
    pos: &mut Position,
    amaf: &mut AmafMap,
    owner: &mut OwnerMap,
    config: &SearchConfig,
    pat3: &Pat3Set,
    rng: &mut Lcg32,
    disp: bool,
) -> f64 {
    let start_n = pos.n;
    let mut passes = 0;
    let mut moves = PointList::new();
    let mut sizes = Vec::new();

    while passes < 2 && pos.n < MAX_GAME_LEN {
        if disp {
            debug!("\n{}", render(pos, None, 0));
        }
        let neighborhood = last_moves_neighbors(pos, rng);

        let mut mv = PASS;
        if gen_playout_moves_capture(
            pos,
            &neighborhood,
            config.prob_heuristic_capture,
            false,
            rng,
            &mut moves,
            &mut sizes,
        ) {
            mv = choose_from(pos, &moves, MoveKind::Capture, rng, config);
        }
        if mv == PASS
            && gen_playout_moves_pat3(
                pos,
                &neighborhood,
                config.prob_heuristic_pat3,
                rng,
                pat3,
                &mut moves,
            )
        {
            mv = choose_from(pos, &moves, MoveKind::Pat3, rng, config);
        }
        if mv == PASS {
            let start = BOARD_IMIN - 1 + rng.below(N * W);
            gen_playout_moves_random(pos, &mut moves, start);
            mv = choose_from(pos, &moves, MoveKind::Random, rng, config);
        }

        if mv == PASS {
            pos.pass();
            passes += 1;
        } else {
            // pos.n was already advanced past the move just played.
            if amaf[mv] == 0 {
                amaf[mv] = if (pos.n - 1) % 2 == 0 { 1 } else { -1 };
            }
            passes = 0;
        }
    }

    let mut s = pos.score(owner);
    if start_n % 2 != pos.n % 2 {
        s = -s;
    }
    s
}

/// Run `n` playouts from the empty board and return the mean score.
pub fn mcbenchmark(
    n: usize,
    config: &SearchConfig,
    pat3: &Pat3Set,
    rng: &mut Lcg32,
) -> f64 {
    let mut owner: OwnerMap = [0; BOARDSIZE];
    let mut sum = 0.0;
    for _ in 0..n {
        let mut pos = Position::new();
        let mut amaf: AmafMap = [0; BOARDSIZE];
        sum += mcplayout(&mut pos, &mut amaf, &mut owner, config, pat3, rng, false);
    }
    sum / n as f64
}
