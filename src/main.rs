use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use phrasedex::command::{Executor, Operation, Outcome};
use phrasedex::index::stats;
use phrasedex::index::FileUpdate;
use phrasedex::output::{Presenter, TerminalPresenter};
use phrasedex::query::SearchHistory;
use phrasedex::utils::{self, Project, Settings};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "phrasedex")]
#[command(about = "Incremental phrase search over project folders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the index up to date (builds it on first use)
    Index {
        /// Path inside the project (auto-detects git root)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Discard the existing index and rebuild from scratch
        #[arg(short, long)]
        force: bool,
    },
    /// Print every line containing all words of a phrase
    Search {
        /// Phrase to search for
        #[arg(required = true, num_args = 1..)]
        phrase: Vec<String>,

        /// Path inside the project
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Prefix each line with its file instead of grouping under a heading
        #[arg(long)]
        no_heading: bool,
    },
    /// Re-index a single file, e.g. after saving it
    Update {
        /// File to update
        file: PathBuf,

        /// Path inside the project (defaults to the file's project)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Show index statistics
    Stats {
        /// Path inside the project
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// List all indexed projects
    List,
    /// Remove a project's index
    Remove {
        /// Path to the project
        path: PathBuf,
    },
    /// Show recent search phrases, newest first
    History {
        /// Path inside the project
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let color = !cli.no_color;

    match cli.command {
        Commands::Index { path, force } => {
            let op = if force { Operation::Reset } else { Operation::Sync };
            let outcome = run(&path, op, TerminalPresenter::new(color, true))?;
            if let Outcome::Indexed(report) = outcome {
                println!(
                    "Indexed: {} added, {} removed, {} vanished",
                    report.added, report.deleted, report.vanished
                );
            }
        }
        Commands::Search {
            phrase,
            path,
            no_heading,
        } => {
            let phrase = phrase.join(" ");
            let outcome = run(
                &path,
                Operation::Search(phrase.clone()),
                TerminalPresenter::new(color, !no_heading),
            )?;
            if let Outcome::Searched { documents: 0, .. } = outcome {
                eprintln!("No matches for \"{}\"", phrase);
                std::process::exit(1);
            }
        }
        Commands::Update { file, path } => {
            let start = path.unwrap_or_else(|| project_hint(&file));
            let outcome = run(
                &start,
                Operation::UpdateSingle(file.clone()),
                TerminalPresenter::new(color, true),
            )?;
            if let Outcome::Updated(update) = outcome {
                let what = match update {
                    FileUpdate::Unchanged => "unchanged",
                    FileUpdate::Indexed => "indexed",
                    FileUpdate::Removed => "removed from index",
                    FileUpdate::Ignored => "ignored",
                };
                println!("{}: {}", file.display(), what);
            }
        }
        Commands::Stats { path } => {
            or_status(stats::show_stats(&path))?;
        }
        Commands::List => {
            stats::list_indexes()?;
        }
        Commands::Remove { path } => {
            let root = utils::find_codebase_root(&path)?;
            utils::remove_index(&root)?;
            println!("Removed index for: {}", root.display());
        }
        Commands::History { path } => {
            or_status(show_history(&path))?;
        }
    }

    Ok(())
}

/// Run one operation on the executor's background thread and wait for it
fn run(start: &Path, op: Operation, presenter: TerminalPresenter) -> Result<Outcome> {
    let project = or_status(Project::discover(start))?;
    let settings = Settings::load(Some(&project.root))?;
    let presenter = Arc::new(presenter);

    let executor = Executor::new(project, settings, presenter.clone());
    let result = executor
        .spawn(op)
        .join()
        .map_err(|_| anyhow!("operation thread panicked"))?;

    presenter.clear()?;
    or_status(result)
}

/// Expected conditions such as a locked or missing index end the command
/// with one status line and exit code 2; anything else is a real error.
fn or_status<T>(result: phrasedex::Result<T>) -> Result<T> {
    match result {
        Err(e) if e.is_recoverable() => {
            eprintln!("phrasedex: {}", e);
            std::process::exit(2);
        }
        result => Ok(result?),
    }
}

/// Where to look for the project of a file that may already be deleted
fn project_hint(file: &Path) -> PathBuf {
    if file.exists() {
        return file.to_path_buf();
    }
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn show_history(path: &Path) -> phrasedex::Result<()> {
    let project = Project::discover(path)?;
    let settings = Settings::load(Some(&project.root))?;
    let history = SearchHistory::load(&project.index_dir()?, settings.history_size)?;

    if history.is_empty() {
        println!("No searches recorded for {}", project.root.display());
        return Ok(());
    }

    for (i, phrase) in history.iter().rev().enumerate() {
        println!("{:4}  {}", i + 1, phrase);
    }

    Ok(())
}
