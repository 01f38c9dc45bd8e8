use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod cli_style;

use athlete_ranking::store::{
    AthleteStore, BadgeStore, HistoryStore, LeaderboardPersistence, SqliteRankingStore,
};
use cli_style::get_styles;

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the ranking database file.
    #[clap(value_parser = parse_path)]
    pub path: PathBuf,
}

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Registers an athlete with the given handle.
    Add { athlete_handle: String },

    /// Shows all registered athletes.
    List,

    /// Shows an athlete with its leaderboard entries, badges and latest submissions.
    Show { athlete_handle: String },

    /// Shows the path of the current ranking db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";
const SHOWN_HISTORY_RECORDS: usize = 5;

fn show_athlete(store: &SqliteRankingStore, athlete_handle: &str) -> Result<()> {
    let athlete = store
        .get_athlete_by_handle(athlete_handle)?
        .with_context(|| format!("No athlete with handle {}", athlete_handle))?;
    println!("{:#?}", athlete);

    let entries: Vec<_> = store
        .load_leaderboard_entries()?
        .into_iter()
        .filter(|e| e.athlete_id == athlete.id)
        .collect();
    println!("\nLeaderboards:");
    if entries.is_empty() {
        println!("  (no submissions)");
    }
    for entry in entries.iter() {
        println!(
            "  - {}/{}: rank {}, score {:.2}, best {:.2}, {} submissions",
            entry.sport,
            entry.level,
            entry.rank,
            entry.score,
            entry.best_score,
            entry.total_submissions
        );
    }

    let badges = store.get_athlete_badges(&athlete.id)?;
    println!("\nBadges:");
    if badges.is_empty() {
        println!("  (none)");
    }
    for badge in badges.iter() {
        println!(
            "  - {} ({}), earned {}",
            badge.kind.as_str(),
            badge.tier.as_str(),
            badge.earned_at
        );
    }

    let records = store.get_history_records(&athlete.id)?;
    println!("\nLatest submissions ({} kept):", records.len());
    for record in records.iter().rev().take(SHOWN_HISTORY_RECORDS) {
        println!(
            "  - {} {}/{}: {:.2}{}",
            record.timestamp,
            record.sport,
            record.level,
            record.score,
            if record.cheat_detected { " (flagged)" } else { "" }
        );
    }
    Ok(())
}

fn execute_command(
    line: String,
    store: &SqliteRankingStore,
    db_path: &str,
) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            println!("{} {}", PROMPT, &line);
            match cli.command {
                InnerCommand::Add { athlete_handle } => match store.create_athlete(&athlete_handle)
                {
                    Ok(id) => println!("Created athlete {} with id {}", athlete_handle, id),
                    Err(err) => return CommandExecutionResult::Error(format!("{:#}", err)),
                },
                InnerCommand::List => match store.list_athletes() {
                    Ok(athletes) if athletes.is_empty() => println!("(no athletes)"),
                    Ok(athletes) => {
                        for athlete in athletes.iter() {
                            println!("{}  {}", athlete.id, athlete.handle);
                        }
                    }
                    Err(err) => return CommandExecutionResult::Error(format!("{:#}", err)),
                },
                InnerCommand::Show { athlete_handle } => {
                    if let Err(err) = show_athlete(store, &athlete_handle) {
                        return CommandExecutionResult::Error(format!("{:#}", err));
                    }
                }
                InnerCommand::Where => {
                    println!("{}", db_path);
                }
                InnerCommand::Exit => {
                    return CommandExecutionResult::Exit;
                }
            }
        }
        Err(e) => {
            println!("{}", e);
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct CommandsHelper {
    commands_names: Vec<String>,
}

impl CommandsHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        CommandsHelper { commands_names }
    }
}

impl Completer for CommandsHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .cloned()
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for CommandsHelper {}
impl Validator for CommandsHelper {}
impl Helper for CommandsHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let store = SqliteRankingStore::new(&cli_args.path)?;
    let db_path = cli_args.path.display().to_string();

    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<CommandsHelper, FileHistory>::with_config(config)?;
    rl.set_helper(Some(CommandsHelper::new()));

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &store, &db_path) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        eprintln!("Error: {}", err);
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
