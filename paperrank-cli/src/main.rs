mod catalog;
mod config;
mod output;
mod store;

use clap::Parser;
use paperrank_core::{
    preference_weights, standings, Choice, Mode, MuPriority, NMatchStrategy, Session, StoreError,
};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::PaperrankConfig;
use crate::store::FileStore;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn checked<T>(result: Result<T, StoreError>) -> T {
    result.unwrap_or_else(|e| bail(e))
}

fn parse_or_bail<T>(value: &str) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().unwrap_or_else(|e| bail(e))
}

#[derive(Parser)]
#[command(name = "paperrank", version, about = "Rank conference papers by pairwise preference")]
struct Cli {
    /// Paper catalog: JSON array of {id, title, category}, or one id<TAB>category<TAB>title per line
    #[arg(long, global = true)]
    papers: Option<PathBuf>,

    /// State file holding ratings, history and selection settings
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Path to config file (default: ~/.config/paperrank/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log selection and persistence details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create a default config file at ~/.config/paperrank/config.toml
    Init,
    /// Show the pair awaiting a vote
    Next,
    /// Vote on the current pair: a, strong-a, b, strong-b, both, neither, skip
    Vote { label: String },
    /// Remove the most recent vote
    Undo,
    /// Clear all ratings and history (selection settings are kept)
    Reset {
        /// Also forget selection settings and delete the state file
        #[arg(long)]
        all: bool,
    },
    /// Change selection settings
    Set(SetArgs),
    /// Print the current ranking
    Standings {
        /// Output JSON instead of table
        #[arg(long)]
        json: bool,

        /// Only show the top N papers
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print preference weights per rated paper as JSON
    Weights,
    /// Interactive loop: read one vote or command per line from stdin
    Session,
}

#[derive(clap::Args)]
struct SetArgs {
    /// Selection mode: active, random, bubble, resolve-ties
    #[arg(long)]
    mode: Option<String>,

    /// Pool ordering: highest, lowest, random
    #[arg(long)]
    priority: Option<String>,

    /// Comparison-count bucket: minimal, maximal, random
    #[arg(long)]
    n_match: Option<String>,

    /// Only pair papers that have won at least once
    #[arg(long)]
    wins_only: Option<bool>,

    /// Bubble mode cutoff rank
    #[arg(long)]
    top_n: Option<usize>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("PAPERRANK_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let Cli {
        papers,
        state,
        config: config_arg,
        verbose,
        command,
    } = Cli::parse();
    init_logging(verbose);

    let config_path = config_arg.unwrap_or_else(config::config_path);

    if let Commands::Init = command {
        config::create_default_config(&config_path);
        println!("Created config at {}", config_path.display());
        println!("Edit it to set your paper catalog and selection defaults.");
        return;
    }

    let cfg = config::load_config(&config_path);
    let papers_path = papers.or_else(|| cfg.papers.clone()).unwrap_or_else(|| {
        bail(format!(
            "No paper catalog specified. Pass --papers or set it in {}",
            config_path.display()
        ))
    });
    let state_path = state
        .or_else(|| cfg.state.clone())
        .unwrap_or_else(config::default_state_path);
    let mut session = open_session(papers_path, state_path, &cfg);

    match command {
        Commands::Init => {}
        Commands::Next => {
            // Persist the shown pair so a later `vote` applies to it.
            checked(session.save());
            show_pair(&session);
        }
        Commands::Vote { label } => {
            let choice: Choice = parse_or_bail(&label);
            if !checked(session.vote(choice)) {
                bail("No pair to vote on. Need at least two eligible papers.");
            }
            show_pair(&session);
        }
        Commands::Undo => {
            if checked(session.undo()) {
                println!("Undid last vote ({} remaining)", session.history().len());
            } else {
                println!("Nothing to undo");
            }
            show_pair(&session);
        }
        Commands::Reset { all } => {
            if all {
                checked(session.wipe());
                println!("Deleted all ratings, history and settings");
            } else {
                checked(session.reset());
                println!("Cleared all ratings and history");
            }
        }
        Commands::Set(args) => {
            apply_settings(&mut session, &args);
            let s = session.selection();
            println!(
                "mode={} priority={} n_match={} wins_only={} top_n={}",
                s.mode, s.mu_priority, s.resolve_tie_n_matches, s.wins_only, s.top_n,
            );
        }
        Commands::Standings { json, limit } => print_standings(&session, json, limit),
        Commands::Weights => output::print_weights(&preference_weights(&session.items())),
        Commands::Session => run_interactive(&mut session),
    }
}

fn open_session(papers_path: PathBuf, state_path: PathBuf, cfg: &PaperrankConfig) -> Session<FileStore> {
    let papers = catalog::load_papers(&papers_path);
    if papers.len() < 2 {
        bail(format!("Need at least 2 papers to rank, got {}", papers.len()));
    }

    let fresh = !state_path.exists();
    let mut session = checked(Session::open(FileStore::new(state_path), papers));
    if fresh {
        apply_config_defaults(&mut session, cfg);
    }
    session
}

/// Seed selection settings from the config file on first run.
fn apply_config_defaults(session: &mut Session<FileStore>, cfg: &PaperrankConfig) {
    apply_settings(
        session,
        &SetArgs {
            mode: cfg.mode.clone(),
            priority: cfg.priority.clone(),
            n_match: cfg.n_match.clone(),
            wins_only: None,
            top_n: cfg.top_n,
        },
    );
}

fn apply_settings(session: &mut Session<FileStore>, args: &SetArgs) {
    if let Some(ref mode) = args.mode {
        checked(session.set_mode(parse_or_bail::<Mode>(mode)));
    }
    if let Some(ref priority) = args.priority {
        checked(session.set_mu_priority(parse_or_bail::<MuPriority>(priority)));
    }
    if let Some(ref n_match) = args.n_match {
        checked(session.set_n_strategy(parse_or_bail::<NMatchStrategy>(n_match)));
    }
    if let Some(wins_only) = args.wins_only {
        checked(session.set_wins_only(wins_only));
    }
    if let Some(top_n) = args.top_n {
        if top_n == 0 {
            bail("--top-n must be at least 1");
        }
        checked(session.set_top_n(top_n));
    }
}

fn show_pair(session: &Session<FileStore>) {
    match session.current_items() {
        Some((a, b)) => output::print_pair(&a, session.paper(&a.id), &b, session.paper(&b.id)),
        None => println!("No pair available. Need at least two eligible papers."),
    }
}

fn print_standings(session: &Session<FileStore>, json: bool, limit: Option<usize>) {
    let mut rows = standings(&session.items());
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    if json {
        output::print_json(&rows);
    } else {
        output::print_table(&rows, session.history().len());
    }
}

const SESSION_HELP: &str = "\
Votes:    a  strong-a  b  strong-b  both  neither  skip
Commands: undo  reset  standings [N]  mode <m>  priority <p>  n-match <s>
          wins-only <true|false>  top-n <N>  help  quit";

fn run_interactive(session: &mut Session<FileStore>) {
    let stdin = io::stdin();
    let prompt = stdin.is_terminal();
    if prompt {
        println!("{SESSION_HELP}\n");
    }
    show_pair(session);

    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        if prompt {
            print!("> ");
            let _ = io::stdout().flush();
        }
        line.clear();
        let read = input
            .read_line(&mut line)
            .unwrap_or_else(|e| bail(format!("Failed to read from stdin: {e}")));
        if read == 0 {
            break;
        }

        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let arg = words.next();

        match (command.to_ascii_lowercase().as_str(), arg) {
            ("quit" | "q" | "exit", _) => break,
            ("help" | "?", _) => {
                println!("{SESSION_HELP}");
                continue;
            }
            ("undo" | "u", _) => {
                if !checked(session.undo()) {
                    println!("Nothing to undo");
                }
            }
            ("reset", _) => {
                checked(session.reset());
                println!("Cleared all ratings and history");
            }
            ("standings" | "s", limit) => {
                let limit = limit.and_then(|l| l.parse().ok()).or(Some(10));
                print_standings(session, false, limit);
                continue;
            }
            (setting, Some(value)) if is_setting(setting) => {
                if let Err(e) = apply_interactive_setting(session, setting, value) {
                    eprintln!("{e}");
                    continue;
                }
            }
            (label, _) => {
                // Unknown labels leave the pair in place.
                if !checked(session.vote_label(label)) {
                    eprintln!("Unrecognized input \"{label}\". Type help for options.");
                    continue;
                }
            }
        }

        println!();
        show_pair(session);
    }
}

fn is_setting(word: &str) -> bool {
    matches!(word, "mode" | "priority" | "n-match" | "wins-only" | "top-n")
}

fn apply_interactive_setting(
    session: &mut Session<FileStore>,
    setting: &str,
    value: &str,
) -> Result<(), String> {
    let stored = match setting {
        "mode" => session.set_mode(value.parse::<Mode>().map_err(|e| format!("{e}"))?),
        "priority" => session.set_mu_priority(value.parse::<MuPriority>().map_err(|e| format!("{e}"))?),
        "n-match" => session.set_n_strategy(value.parse::<NMatchStrategy>().map_err(|e| format!("{e}"))?),
        "wins-only" => session.set_wins_only(
            value
                .parse::<bool>()
                .map_err(|_| format!("wins-only expects true or false, got \"{value}\""))?,
        ),
        "top-n" => match value.parse::<usize>() {
            Ok(n) if n >= 1 => session.set_top_n(n),
            _ => return Err(format!("top-n expects a positive integer, got \"{value}\"")),
        },
        other => return Err(format!("unknown setting \"{other}\"")),
    };
    checked(stored);
    Ok(())
}
