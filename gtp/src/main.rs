//! tengen - a minimalistic MCTS Go engine.
//!
//! Subcommands:
//! - `gtp`: the GTP command loop on stdin/stdout (the normal mode)
//! - `mcdebug`: one playout from the empty board, score on stdout
//! - `mcbenchmark [n]`: n playouts from the empty board, mean score
//! - `tsdebug`: one small fixed search, chosen move on stderr
//!
//! `-z SEED` fixes the random seed for reproducible runs; 0 derives a
//! seed from the clock.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use goban::board::{Position, BOARDSIZE, OwnerMap};
use goban::coords::render;
use goban::rng::Lcg32;
use mcts::{AmafMap, BestMove, Engine, Tree};
use patterns::{LargePatternDict, Pat3Set};

mod config;
mod debug_cmds;
mod gtp;
mod logging;

#[derive(Parser)]
#[command(name = "tengen", version, about = "Minimalistic MCTS Go engine")]
struct Cli {
    /// Random seed (> 0 fixed, 0 = derive from the clock).
    #[arg(short = 'z', long, default_value_t = 1)]
    seed: u32,

    /// Explicit config file (otherwise tengen.toml is searched for).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Speak GTP on stdin/stdout.
    Gtp,
    /// Run one playout from the empty board and print its score.
    Mcdebug,
    /// Run playouts from the empty board and print the mean score.
    Mcbenchmark {
        #[arg(default_value_t = 2000)]
        n: usize,
    },
    /// Run a small search from the empty board and print the move.
    Tsdebug,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load(cli.config.as_deref());
    logging::init(&settings.log)?;

    let seed = if cli.seed == 0 {
        let derived = Lcg32::from_time();
        info!("seed derived from clock");
        derived
    } else {
        Lcg32::new(cli.seed)
    };

    let pat3 = Pat3Set::build();
    let mut dict = LargePatternDict::new();
    match dict.load(&settings.patterns.prob_file, &settings.patterns.spat_file) {
        Ok(npats) => info!(patterns = npats, "pattern files loaded"),
        Err(e) => warn!(
            error = %e,
            "cannot load pattern files, the engine will be much weaker"
        ),
    }
    let mut engine = Engine::new(settings.search.clone(), pat3, dict, seed);

    match cli.command {
        Command::Gtp => gtp::run(&mut engine)?,
        Command::Mcdebug => {
            let mut pos = Position::new();
            let mut amaf: AmafMap = [0; BOARDSIZE];
            let mut owner: OwnerMap = [0; BOARDSIZE];
            let score = engine.playout(&mut pos, &mut amaf, &mut owner, true);
            println!("{score}");
        }
        Command::Mcbenchmark { n } => {
            let mean = engine.benchmark(n);
            println!("{mean:.6}");
        }
        Command::Tsdebug => {
            let pos = Position::new();
            let mut owner: OwnerMap = [0; BOARDSIZE];
            let mut tree = Tree::new(pos.clone());
            let mv = engine.tree_search(&mut tree, &mut owner);
            eprintln!("move = {}", mv.to_gtp());
            if let BestMove::Play(pt) = mv {
                let mut shown = pos;
                shown.play(pt).expect("search returned illegal move");
                eprint!("{}", render(&shown, None, 0));
            }
        }
    }
    Ok(())
}
