use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};

use issuemake_core::config::effective_config;
use issuemake_core::issue::{issues_to_json, Issue, IssueType, Stage};
use issuemake_core::store::IssueStore;
use issuemake_core::titlegen::{fallback_title, generate_title};

#[derive(Parser)]
#[command(
    name = "issuemake",
    version,
    about = "Plain-text issue tracking with a stash/doing/achieved lifecycle"
)]
struct Cli {
    /// Project root holding the .issues tree (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new issue in the stash
    Create {
        /// Issue title; derived from the description when omitted
        title: Option<String>,
        /// Issue type: feat, todo, bug or refact
        #[arg(long = "type", value_name = "TYPE", default_value = "todo")]
        kind: String,
        /// Description body
        #[arg(long, default_value = "")]
        desc: String,
    },
    /// Move an issue into doing, seed the solution file, publish the brief
    Open {
        /// Issue number or (part of) its title
        identifier: String,
    },
    /// Archive a doing-stage issue, merging in the solution text
    Close {
        /// Issue number or (part of) its title
        identifier: String,
    },
    /// Resolve an identifier and print the matching issue
    Find {
        /// Issue number or (part of) its title
        identifier: String,
    },
    /// List active issues (stash and doing)
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("resolve current directory")?,
    };
    let store = IssueStore::new(&root);

    match command {
        Command::Create { title, kind, desc } => {
            let kind: IssueType = kind.parse()?;
            let title = title.unwrap_or_else(|| resolve_title(&root, &desc));
            let issue = store.create(&title, kind, &desc)?;
            println!("Created issue {}: {}", issue.number, issue.title);
            println!("  {}", issue.file_path.display());
        }
        Command::Open { identifier } => {
            let outcome = store.open(&identifier)?;
            println!(
                "Opened issue {}: {}",
                outcome.issue.number, outcome.issue.title
            );
            println!("  solution: {}", outcome.solution_path.display());
            println!("  brief:    {}", store.brief_path().display());
        }
        Command::Close { identifier } => {
            let outcome = store.close(&identifier)?;
            println!("Archived to {}", outcome.archived_path.display());
        }
        Command::Find { identifier } => match store.find(&identifier)? {
            Some(issue) => println!("{}", render_issue_line(&issue)),
            None => println!("No issue matches '{}'", identifier),
        },
        Command::List { json } => {
            let mut issues = Vec::new();
            for stage in [Stage::Stash, Stage::Doing] {
                let scan = store.scan_stage(stage)?;
                for (path, err) in &scan.malformed {
                    eprintln!("warning: skipped {}: {}", path.display(), err);
                }
                issues.extend(scan.issues);
            }
            if json {
                println!("{}", issues_to_json(&issues));
            } else if issues.is_empty() {
                println!("No active issues.");
            } else {
                for issue in &issues {
                    println!("{}", render_issue_line(issue));
                }
            }
        }
        Command::Version => {
            println!("issuemake {}", issuemake_core::version());
        }
    }
    Ok(())
}

/// Best-effort title: ask the configured endpoint, fall back to a timestamp
/// title when generation is unconfigured or fails.
fn resolve_title(root: &std::path::Path, description: &str) -> String {
    let config = effective_config(root);
    if config.is_title_generation_configured() && !description.trim().is_empty() {
        match generate_title(&config, description) {
            Ok(title) => return title,
            Err(err) => eprintln!("warning: title generation failed: {}", err),
        }
    }
    fallback_title(Local::now())
}

fn render_issue_line(issue: &Issue) -> String {
    format!(
        "{} | {} | {} | {}",
        issue.number,
        issue.stage,
        issue.kind,
        issue.title
    )
}
