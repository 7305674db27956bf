//! Debug subcommands.
//!
//! `debug <subcmd> ...` exposes the engine internals over GTP for
//! regression scripts and interactive inspection: position setup, raw
//! playouts, heuristic move generation, pattern matching and the cached
//! 3x3 environment codes.

use goban::board::{BOARDSIZE, OTHER, PASS, TO_PLAY};
use goban::coords::{parse_coord, render, str_coord};
use goban::sets::PointList;
use goban::tactics::fix_atari;
use mcts::{last_moves_neighbors, AmafMap};
use patterns::LargeBoard;

use crate::gtp::Session;

const SUBCOMMANDS: &[&str] = &[
    "env8",
    "fix_atari",
    "gen_playout",
    "help",
    "match_pat",
    "playout",
    "savepos",
    "setpos",
];

pub(crate) fn handle(session: &mut Session, args: &[&str]) -> Result<String, String> {
    let Some((&sub, rest)) = args.split_first() else {
        return Err("Error missing debug subcommand".into());
    };
    match sub {
        "setpos" => setpos(session, rest),
        "savepos" => savepos(session, rest),
        "playout" => playout(session),
        "gen_playout" => gen_playout(session, rest),
        "match_pat" => match_pat(session, rest),
        "fix_atari" => fix_atari_cmd(session, rest),
        "env8" => env8(session, rest),
        "help" => Ok(SUBCOMMANDS.join("\n")),
        other => Err(format!("Error unknown debug subcommand - {other}")),
    }
}

/// Play out a sequence of alternating moves ("pass" allowed).
fn setpos(session: &mut Session, moves: &[&str]) -> Result<String, String> {
    for mv in moves {
        let pt = parse_coord(mv).ok_or_else(|| format!("Error bad coordinate {mv}"))?;
        if pt == PASS {
            session.pos.pass();
        } else {
            session
                .pos
                .play(pt)
                .map_err(|e| format!("Error Illegal move {mv}: {e}"))?;
        }
    }
    Ok(String::new())
}

fn savepos(session: &mut Session, args: &[&str]) -> Result<String, String> {
    let path = args.first().ok_or("Error missing filename")?;
    std::fs::write(path, render(&session.pos, None, 0))
        .map_err(|e| format!("Error cannot write {path}: {e}"))?;
    Ok(String::new())
}

/// Run one verbose playout on the live position.
fn playout(session: &mut Session) -> Result<String, String> {
    let mut amaf: AmafMap = [0; BOARDSIZE];
    let score = session
        .engine
        .playout(&mut session.pos, &mut amaf, &mut session.owner, true);
    Ok(format!("{score}"))
}

fn gen_playout(session: &mut Session, args: &[&str]) -> Result<String, String> {
    let kind = *args.first().ok_or("Error - missing [capture|pat3]")?;
    let neighborhood = last_moves_neighbors(&session.pos, session.engine.rng_mut());
    let mut moves = PointList::new();
    match kind {
        "capture" => {
            let mut sizes = Vec::new();
            session.engine.suggest_captures(
                &session.pos,
                &neighborhood,
                1.0,
                false,
                &mut moves,
                &mut sizes,
            );
        }
        "pat3" => {
            session
                .engine
                .suggest_pat3(&session.pos, &neighborhood, 1.0, &mut moves);
        }
        _ => return Err("Error - missing [capture|pat3]".into()),
    }
    Ok(points_str(&moves))
}

/// List the large-pattern ids matching at a point, widest last.
fn match_pat(session: &mut Session, args: &[&str]) -> Result<String, String> {
    let coord = args.first().ok_or("Error missing point")?;
    let pt = parse_coord(coord)
        .filter(|&pt| pt != PASS)
        .ok_or_else(|| format!("Error bad coordinate {coord}"))?;
    let verbose = args.len() > 1;
    let board = LargeBoard::from_position(&session.pos);
    let ids = session.engine.large().matching_ids(&board, pt);
    let mut out = String::new();
    for (id, prob) in ids {
        if verbose {
            out.push_str(&format!("{id}({prob:.3}) "));
        } else {
            out.push_str(&format!("{id} "));
        }
    }
    Ok(out.trim_end().to_string())
}

fn fix_atari_cmd(session: &mut Session, args: &[&str]) -> Result<String, String> {
    let coord = args.first().ok_or("Error -- point missing")?;
    let pt = parse_coord(coord)
        .filter(|&pt| pt != PASS)
        .ok_or_else(|| format!("Error bad coordinate {coord}"))?;
    let color = session.pos.color[pt];
    if color != TO_PLAY && color != OTHER {
        return Err("Error given point not occupied by a stone".into());
    }
    let mut moves = PointList::new();
    let mut sizes = Vec::new();
    let in_atari = fix_atari(&session.pos, pt, false, true, false, &mut moves, &mut sizes);
    let mut out = format!("{}", u8::from(in_atari));
    let listed = points_str(&moves);
    if !listed.is_empty() {
        out.push(' ');
        out.push_str(&listed);
    }
    Ok(out)
}

/// Show the cached 3x3 environment of a point as a small grid.
fn env8(session: &mut Session, args: &[&str]) -> Result<String, String> {
    let coord = args.first().ok_or("Error missing point")?;
    let pt = parse_coord(coord)
        .filter(|&pt| pt != PASS)
        .ok_or_else(|| format!("Error bad coordinate {coord}"))?;
    let env8 = ((session.pos.env4d[pt] as u16) << 8) | session.pos.env4[pt] as u16;

    let cell = |slot: u16| -> char {
        let nibble = if slot >= 4 { env8 >> 8 } else { env8 & 0xFF };
        let shifted = nibble >> (slot % 4);
        let hi = (shifted >> 4) & 1;
        let lo = shifted & 1;
        match (hi << 1) | lo {
            0 => 'O',
            1 => 'X',
            2 => '.',
            _ => '#',
        }
    };
    // Grid rows: NW N NE / W . E / SW S SE.
    Ok(format!(
        "env8 = {}\n{} {} {}\n{} {} {}\n{} {} {}",
        env8,
        cell(7),
        cell(0),
        cell(4),
        cell(3),
        '.',
        cell(1),
        cell(6),
        cell(2),
        cell(5)
    ))
}

fn points_str(moves: &PointList) -> String {
    moves
        .iter()
        .map(str_coord)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use goban::rng::Lcg32;
    use mcts::{Engine, SearchConfig};
    use patterns::{LargePatternDict, Pat3Set};

    fn engine() -> Engine {
        Engine::new(
            SearchConfig::for_testing(),
            Pat3Set::build(),
            LargePatternDict::with_key_bits(12),
            Lcg32::new(1),
        )
    }

    #[test]
    fn test_setpos_and_fix_atari_escape() {
        let mut e = engine();
        let mut s = Session::new(&mut e);
        let resp = s
            .handle_line("debug setpos C8 C9 E9 B8 F9 D8")
            .unwrap();
        assert!(resp.starts_with('='), "setpos failed: {resp}");
        let resp = s.handle_line("10 debug fix_atari C8").unwrap();
        assert_eq!(resp, "=10 1 C7\n\n");
    }

    #[test]
    fn test_fix_atari_requires_stone() {
        let mut e = engine();
        let mut s = Session::new(&mut e);
        let resp = s.handle_line("debug fix_atari D4").unwrap();
        assert!(resp.starts_with('?'));
    }

    #[test]
    fn test_env8_grid_shape() {
        let mut e = engine();
        let mut s = Session::new(&mut e);
        s.handle_line("debug setpos C5 D6");
        let resp = s.handle_line("debug env8 D5").unwrap();
        assert!(resp.starts_with('='));
        // Board around D5: White D6 above, Black C5 left.
        assert!(resp.contains("O"), "north stone missing: {resp}");
        assert!(resp.contains("X"), "west stone missing: {resp}");
    }

    #[test]
    fn test_gen_playout_capture_lists_atari_defense() {
        let mut e = engine();
        let mut s = Session::new(&mut e);
        // Black B1/E5 vs White A1/G5: Black to move, A1 sits in atari
        // right next to the last moves.
        s.handle_line("debug setpos B1 A1 E5 G5");
        let resp = s.handle_line("debug gen_playout capture").unwrap();
        assert!(resp.starts_with('='));
        // G5 (White, last move) neighborhood analysis runs; the A1
        // stone is out of the neighborhood, so the list may be empty,
        // but the command itself must succeed.
    }

    #[test]
    fn test_match_pat_without_dictionary_is_empty() {
        let mut e = engine();
        let mut s = Session::new(&mut e);
        let resp = s.handle_line("debug match_pat G7").unwrap();
        assert_eq!(resp, "= \n\n");
    }

    #[test]
    fn test_unknown_subcommand() {
        let mut e = engine();
        let mut s = Session::new(&mut e);
        let resp = s.handle_line("debug warp").unwrap();
        assert!(resp.starts_with('?'));
    }
}
