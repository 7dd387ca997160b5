//! `dsecure` CLI: drive the reaction counter against a local profile.
//!
//! A profile is a redb file standing in for one browser's local storage.
//! Reactions recorded through the CLI persist in that file between runs.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dsecure_core::content;
use dsecure_core::counter::ReactionCounter;
use dsecure_core::reaction::{Reaction, ReactionRecord};
use dsecure_storage::RedbBackend;

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ── CLI structure ────────────────────────────────────────────────────

/// D-Secure: reactions and articles from the command line.
#[derive(Parser)]
#[command(
    name = "dsecure",
    version,
    about = "D-Secure CLI: like, dislike, and inspect articles",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         DSECURE_PROFILE   Profile file (default: ./dsecure-profile.redb)\n\n\
         {DIM}Examples:{RESET}\n  \
         dsecure articles\n  \
         dsecure like erasing-ssds-safely\n  \
         dsecure show erasing-ssds-safely --json"
    ),
)]
struct Cli {
    /// Profile file holding this "browser's" reactions.
    #[arg(long, env = "DSECURE_PROFILE", default_value = "./dsecure-profile.redb")]
    profile: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show counts and your reaction for an item.
    Show {
        /// Item identifier (an article slug).
        item: String,
        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Like an item, or retract your like.
    Like {
        item: String,
        #[arg(long)]
        json: bool,
    },
    /// Dislike an item, or retract your dislike.
    Dislike {
        item: String,
        #[arg(long)]
        json: bool,
    },
    /// List the article catalog, newest first.
    Articles {
        #[arg(long)]
        json: bool,
    },
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<12}{RESET} {WHITE}{value}{RESET}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn print_record(record: &ReactionRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    header("◆", &record.item_id);
    kv_line("👍", &record.like_label());
    kv_line("👎", &record.dislike_label());
    let yours = match record.reaction {
        Reaction::None => format!("{DIM}none{RESET}"),
        Reaction::Liked => format!("{GREEN}liked{RESET}"),
        Reaction::Disliked => format!("{RED}disliked{RESET}"),
    };
    kv_line("you", &yours);
    if record.degraded {
        warning("profile storage unavailable, this change was not saved");
    }
    Ok(())
}

fn print_articles(json: bool) -> Result<()> {
    let articles = content::articles();
    if json {
        println!("{}", serde_json::to_string_pretty(&articles)?);
        return Ok(());
    }

    header("◆", "Articles");
    for article in articles {
        println!(
            "  {DIM}{}{RESET}  {BOLD}{}{RESET}\n  {DIM}{}{RESET}",
            article.published, article.slug, article.title
        );
    }
    Ok(())
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli.profile, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(profile: &Path, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Articles { json } => print_articles(json),
        Commands::Show { item, json } => {
            let record = open_counter(profile)?.initialize(&item).await?;
            print_record(&record, json)
        }
        Commands::Like { item, json } => {
            let record = open_counter(profile)?.like(&item).await?;
            print_record(&record, json)
        }
        Commands::Dislike { item, json } => {
            let record = open_counter(profile)?.dislike(&item).await?;
            print_record(&record, json)
        }
    }
}

fn open_counter(profile: &Path) -> Result<ReactionCounter> {
    tracing::debug!(profile = %profile.display(), "opening reaction profile");
    let backend = RedbBackend::open(profile)
        .with_context(|| format!("failed to open profile {}", profile.display()))?;
    Ok(ReactionCounter::new(Arc::new(backend)))
}
