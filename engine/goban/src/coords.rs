//! Coordinate parsing and board rendering.
//!
//! Column letters follow Go convention and skip `I` (A-H, J-T); rows are
//! 1-indexed from the bottom. `pass` round-trips through both functions.

use std::fmt;

use crate::board::{OwnerMap, Point, Position, EMPTY, N, OTHER, PASS, TO_PLAY};

/// Column letters indexed by column number (index 0 unused).
const COLSTR: &[u8] = b"@ABCDEFGHJKLMNOPQRST";

/// Parse a GTP coordinate ("D4", "pass") into a point.
///
/// Returns `None` for malformed or out-of-range coordinates and
/// `Some(PASS)` for a pass.
pub fn parse_coord(s: &str) -> Option<Point> {
    if s.eq_ignore_ascii_case("pass") {
        return Some(PASS);
    }
    let mut chars = s.chars();
    let c = chars.next()?.to_ascii_uppercase();
    if !c.is_ascii_uppercase() || c == 'I' {
        return None;
    }
    let col = if c < 'J' {
        c as usize - '@' as usize
    } else {
        c as usize - '@' as usize - 1
    };
    let row: usize = chars.as_str().parse().ok()?;
    if col < 1 || col > N || row < 1 || row > N {
        return None;
    }
    Some((N - row + 1) * (N + 1) + col)
}

/// Format a point as a GTP coordinate.
pub fn str_coord(pt: Point) -> String {
    if pt == PASS {
        return "pass".to_string();
    }
    let row = pt / (N + 1);
    let col = pt % (N + 1);
    format!("{}{}", COLSTR[col] as char, N + 1 - row)
}

/// Display character for a stone, converting the relative `X`/`x`
/// encoding back to absolute Black (`X`) / White (`O`).
fn pretty(c: u8, black_to_play: bool) -> char {
    match c {
        TO_PLAY => {
            if black_to_play {
                'X'
            } else {
                'O'
            }
        }
        OTHER => {
            if black_to_play {
                'O'
            } else {
                'X'
            }
        }
        EMPTY => '.',
        _ => ' ',
    }
}

/// Render the board. The last move is wrapped in parentheses; when an
/// owner map is supplied a second grid summarizes territory estimates
/// (thresholds at 30% and 60% of `n_sims` playouts).
pub fn render(pos: &Position, owner: Option<&OwnerMap>, n_sims: usize) -> String {
    use std::fmt::Write;

    let black_to_play = pos.black_to_play();
    let (cap_black, cap_white) = if black_to_play {
        (pos.cap_x, pos.cap)
    } else {
        (pos.cap, pos.cap_x)
    };

    let mut out = String::with_capacity(1024);
    write!(
        out,
        "Move: {:<3} Black: {} caps White: {} caps Komi: {:.1}",
        pos.n, cap_black, cap_white, pos.komi
    )
    .unwrap();
    if pos.ko != PASS {
        write!(out, " ko: {}", str_coord(pos.ko)).unwrap();
    }
    out.push('\n');

    for row in 1..=N {
        write!(out, " {:>2}", N - row + 1).unwrap();
        for col in 1..=N {
            let k = row * (N + 1) + col;
            if pos.last != PASS && pos.last == k {
                out.push('(');
            } else if pos.last != PASS && col > 1 && pos.last == k - 1 {
                out.push(')');
            } else {
                out.push(' ');
            }
            out.push(pretty(pos.color[k], black_to_play));
        }
        if pos.last != PASS && pos.last == row * (N + 1) + N {
            out.push(')');
        }
        if let Some(map) = owner {
            out.push_str("   ");
            let n_sims = n_sims.max(1) as f64;
            for col in 1..=N {
                let k = row * (N + 1) + col;
                let v = map[k] as f64;
                let c = if v > 0.6 * n_sims {
                    'X'
                } else if v > 0.3 * n_sims {
                    'x'
                } else if v < -0.6 * n_sims {
                    'O'
                } else if v < -0.3 * n_sims {
                    'o'
                } else {
                    '.'
                };
                out.push(' ');
                out.push(c);
            }
        }
        out.push('\n');
    }
    out.push_str("   ");
    for col in 1..=N {
        out.push(' ');
        out.push(COLSTR[col] as char);
    }
    out.push('\n');
    out
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self, None, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BOARD_IMAX, BOARD_IMIN, OUT};

    #[test]
    fn test_roundtrip_every_point() {
        let pos = Position::new();
        for pt in BOARD_IMIN..BOARD_IMAX {
            if pos.color[pt] == OUT {
                continue;
            }
            let s = str_coord(pt);
            assert_eq!(parse_coord(&s), Some(pt), "roundtrip failed for {s}");
        }
    }

    #[test]
    fn test_pass_roundtrip() {
        assert_eq!(parse_coord("pass"), Some(PASS));
        assert_eq!(parse_coord("PASS"), Some(PASS));
        assert_eq!(str_coord(PASS), "pass");
    }

    #[test]
    fn test_column_letters_skip_i() {
        // Column 9 is J, not I.
        let j1 = parse_coord("J1").unwrap();
        assert_eq!(j1 % (N + 1), 9);
        assert_eq!(parse_coord("I1"), None);
    }

    #[test]
    fn test_corners() {
        assert_eq!(parse_coord("A1"), Some(N * (N + 1) + 1));
        assert_eq!(parse_coord("A13"), Some((N + 1) + 1));
        assert_eq!(str_coord(N * (N + 1) + N), "N1");
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_coord(""), None);
        assert_eq!(parse_coord("Z9"), None);
        assert_eq!(parse_coord("A0"), None);
        assert_eq!(parse_coord("A99"), None);
        assert_eq!(parse_coord("4D"), None);
    }

    #[test]
    fn test_render_marks_last_move() {
        let mut pos = Position::new();
        pos.play(parse_coord("D4").unwrap()).unwrap();
        let shown = render(&pos, None, 0);
        assert!(shown.contains("(X"), "last move should be parenthesized:\n{shown}");
        assert!(shown.contains("Move: 1"));
    }
}
