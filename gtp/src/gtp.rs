//! GTP command loop.
//!
//! One command per line, optionally prefixed with a numeric id; replies
//! are `=id result` on success and `?id message` on error, each
//! terminated by a blank line. The engine assumes alternating play: the
//! color argument of `play`/`genmove` is accepted and ignored.

use std::io::{self, BufRead, Write};
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info};

use goban::board::{OwnerMap, Position, BOARDSIZE, N, PASS};
use goban::coords::{parse_coord, render};
use mcts::{BestMove, Engine};

use crate::debug_cmds;

const KNOWN_COMMANDS: &[&str] = &[
    "boardsize",
    "clear_board",
    "cputime",
    "debug",
    "genmove",
    "help",
    "known_command",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "version",
];

/// State carried across GTP commands.
pub struct Session<'e> {
    pub(crate) engine: &'e mut Engine,
    pub(crate) pos: Position,
    pub(crate) owner: OwnerMap,
    started: Instant,
    game_ongoing: bool,
    games: u32,
    quit: bool,
}

impl<'e> Session<'e> {
    pub fn new(engine: &'e mut Engine) -> Self {
        Self {
            engine,
            pos: Position::new(),
            owner: [0; BOARDSIZE],
            started: Instant::now(),
            game_ongoing: false,
            games: 0,
            quit: false,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Process one input line. Returns the full response text, or None
    /// for lines that produce no response (blank lines, comments).
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        info!(command = line, "gtp");
        let mut tokens = line.split_whitespace();
        let first = tokens.next()?;
        if first.starts_with('#') {
            return None;
        }
        let (id, command) = if first.chars().all(|c| c.is_ascii_digit()) {
            match tokens.next() {
                Some(cmd) => (first, cmd),
                None => return Some(format!("?{first} missing command\n\n")),
            }
        } else {
            ("", first)
        };
        let args: Vec<&str> = tokens.collect();

        let response = match self.dispatch(command, &args) {
            Ok(result) => format!("={id} {result}\n\n"),
            Err(message) => format!("?{id} {message}\n\n"),
        };
        debug!(
            "\n{}",
            render(&self.pos, Some(&self.owner), self.engine.config().n_sims)
        );
        Some(response)
    }

    fn dispatch(&mut self, command: &str, args: &[&str]) -> Result<String, String> {
        match command {
            "play" => {
                self.game_ongoing = true;
                // First argument is the color, ignored under alternate
                // play; accept a bare vertex too.
                let vertex = match args {
                    [_, vertex, ..] => vertex,
                    [vertex] => vertex,
                    [] => return Err("Error missing argument".into()),
                };
                let pt = parse_coord(vertex)
                    .ok_or_else(|| format!("Error Illegal move: bad coordinate {vertex}"))?;
                if pt == PASS {
                    self.pos.pass();
                    Ok(String::new())
                } else {
                    self.pos
                        .play(pt)
                        .map(|_| String::new())
                        .map_err(|e| format!("Error Illegal move: {e}"))
                }
            }
            "genmove" => {
                self.game_ongoing = true;
                if self.pos.last == PASS && self.pos.n >= 2 {
                    info!("opponent passed, answering with a pass");
                    self.pos.pass();
                    return Ok("pass".into());
                }
                let mv = self.engine.genmove(&self.pos, &mut self.owner);
                match mv {
                    BestMove::Play(pt) => {
                        self.pos
                            .play(pt)
                            .map_err(|e| format!("Error Illegal move: {e}"))?;
                    }
                    BestMove::Pass => self.pos.pass(),
                    BestMove::Resign => {}
                }
                Ok(mv.to_gtp())
            }
            "clear_board" => {
                if self.game_ongoing {
                    self.begin_game();
                }
                self.game_ongoing = false;
                self.pos.clear();
                self.owner = [0; BOARDSIZE];
                Ok(String::new())
            }
            "boardsize" => {
                let size: usize = args
                    .first()
                    .ok_or("Error missing argument")?
                    .parse()
                    .map_err(|_| "Error bad boardsize")?;
                if size == N {
                    Ok(String::new())
                } else {
                    Err(format!("Error: boardsize {size} unsupported (built for {N})"))
                }
            }
            "name" => Ok("tengen".into()),
            "version" => Ok(env!("CARGO_PKG_VERSION").into()),
            "protocol_version" => Ok("2".into()),
            "list_commands" | "help" => Ok(KNOWN_COMMANDS.join("\n")),
            "known_command" => {
                let queried = args.first().ok_or("Error missing argument")?;
                Ok(KNOWN_COMMANDS.iter().any(|k| k == queried).to_string())
            }
            "cputime" => Ok(format!("{:.3}", self.started.elapsed().as_secs_f64())),
            "quit" => {
                self.quit = true;
                Ok(String::new())
            }
            "debug" => debug_cmds::handle(self, args),
            other => Err(format!("Warning: Ignoring unknown command - {other}")),
        }
    }

    fn begin_game(&mut self) {
        self.games += 1;
        info!(game = self.games, "BEGIN GAME");
    }
}

/// Read GTP commands from stdin until EOF or `quit`.
pub fn run(engine: &mut Engine) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = Session::new(engine);
    for line in stdin.lock().lines() {
        let line = line?;
        let Some(response) = session.handle_line(&line) else {
            continue;
        };
        let mut out = stdout.lock();
        out.write_all(response.as_bytes())?;
        out.flush()?;
        if session.quit_requested() {
            break;
        }
    }
    Ok(())
}
