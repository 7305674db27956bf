//! Atari and ladder reading scenarios.
//!
//! Positions are set up GTP-style with alternating play (Black first),
//! then the tactical reader is queried exactly as the engine's debug
//! interface does: `singlept_ok` off, two-liberty test on.

use goban::board::{Point, Position, PASS};
use goban::coords::{parse_coord, str_coord};
use goban::sets::PointList;
use goban::tactics::fix_atari;

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

fn query(pos: &Position, at: &str) -> (bool, Vec<Point>, Vec<usize>) {
    let mut moves = PointList::new();
    let mut sizes = Vec::new();
    let in_atari = fix_atari(pos, pt(at), false, true, false, &mut moves, &mut sizes);
    (in_atari, moves.as_slice().to_vec(), sizes)
}

fn show(moves: &[Point]) -> String {
    moves.iter().map(|&m| str_coord(m)).collect::<Vec<_>>().join(" ")
}

#[test]
fn escape_by_running() {
    // Black C8 hemmed in by C9/B8/D8 escapes downward at C7.
    let pos = setup(&["C8", "C9", "E9", "B8", "F9", "D8"]);
    let (in_atari, moves, sizes) = query(&pos, "C8");
    assert!(in_atari);
    assert_eq!(show(&moves), "C7");
    assert_eq!(sizes.len(), moves.len());
}

#[test]
fn escape_into_corner() {
    let pos = setup(&["C1", "G7", "B2", "B1"]);
    let (in_atari, moves, _) = query(&pos, "B1");
    assert!(in_atari);
    assert!(moves.contains(&pt("A1")), "expected A1 escape, got [{}]", show(&moves));
}

#[test]
fn counter_capture_and_escape() {
    // Black A1 in atari; capturing White A2 at A3 or connecting at B1
    // both save it.
    let pos = setup(&["A1", "E5", "B2", "A2"]);
    let (in_atari, moves, _) = query(&pos, "A1");
    assert!(in_atari);
    assert!(moves.contains(&pt("A3")), "expected counter-capture A3, got [{}]", show(&moves));
    assert!(moves.contains(&pt("B1")), "expected connection B1, got [{}]", show(&moves));
}

#[test]
fn lost_corner_ladder_offers_no_escape() {
    // Black A1 chased by White A2: the crawl along the first line is a
    // working ladder, so no escape is proposed.
    let pos = setup(&["A1", "A2"]);
    let (in_atari, moves, _) = query(&pos, "A1");
    assert!(in_atari);
    assert!(moves.is_empty(), "ladder is lost, got [{}]", show(&moves));
}

#[test]
fn ladder_breaker_restores_escape() {
    // Same corner ladder, but Black G1 waits at the end of the line.
    let pos = setup(&["A1", "A2", "G1"]);
    let (in_atari, moves, _) = query(&pos, "A1");
    assert!(in_atari);
    assert!(moves.contains(&pt("B1")), "broken ladder allows B1, got [{}]", show(&moves));
}

#[test]
fn blocked_ladder_breaker_loses_again() {
    // White D2 cuts the path to the breaker; the ladder works once more.
    let pos = setup(&["A1", "A2", "G1", "D2"]);
    let (in_atari, moves, _) = query(&pos, "A1");
    assert!(in_atari);
    assert!(!moves.contains(&pt("B1")), "ladder works again, got [{}]", show(&moves));
}

#[test]
fn two_liberty_block_threatened_by_ladder() {
    // The G5/H5 pair has two liberties but runs into a ladder; the
    // reader proposes a capture threat at one of them.
    let pos = setup(&["G5", "F5", "A1", "G4", "A2", "H4", "A3", "G6", "H5"]);
    let (in_atari, moves, _) = query(&pos, "G5");
    assert!(!in_atari, "two liberties is not atari");
    assert!(
        moves.contains(&pt("H6")) || moves.contains(&pt("J5")),
        "expected H6 or J5 as ladder continuation, got [{}]",
        show(&moves)
    );
}

#[test]
fn surrounded_group_with_no_out() {
    let pos = setup(&["D3", "F3", "E3", "G3", "F2", "E2", "G2", "H2", "D2"]);
    let (in_atari, moves, _) = query(&pos, "E2");
    assert!(in_atari);
    assert!(moves.is_empty(), "no escape exists, got [{}]", show(&moves));
}

#[test]
fn edge_only_mode_skips_interior_two_liberty_blocks() {
    let pos = setup(&["G5", "F5", "A1", "G4", "A2", "H4", "A3", "G6", "H5"]);
    let mut moves = PointList::new();
    let mut sizes = Vec::new();
    // Both liberties (H6, J5) are above the first line, so the edge-only
    // variant skips the ladder read entirely.
    let in_atari = fix_atari(&pos, pt("G5"), false, true, true, &mut moves, &mut sizes);
    assert!(!in_atari);
    assert!(moves.is_empty());
}
