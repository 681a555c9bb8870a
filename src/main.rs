mod artifact;
mod azure;
mod config;
mod git;
mod prompt;
mod review;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::artifact::DiffSummary;
use crate::git::branches;

/// PR Review Diff: turns two branches, or an Azure DevOps Pull Request URL,
/// into a diff file ready for an AI code review.
#[derive(Parser, Debug)]
#[command(name = "pr-review", version, about)]
struct Cli {
    /// Git working tree to operate in
    #[arg(short = 'C', long, default_value = ".")]
    workspace: PathBuf,

    /// Config file (defaults to .pr-review.toml in the workspace)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List local and remote branches, most recent first
    Branches {
        /// Order for target selection (default branches first)
        #[arg(long)]
        target: bool,
    },

    /// Diff two branches (target...source) into the diff file
    Diff {
        /// Branch with the changes
        #[arg(short, long)]
        source: String,

        /// Branch the changes will merge into
        #[arg(short, long)]
        target: String,
    },

    /// Fetch an Azure DevOps PR (e.g., https://dev.azure.com/org/project/_git/repo/pullrequest/42)
    /// and write its header and diff into the diff file
    Review {
        url: String,

        /// Don't ask when the remote doesn't look like the PR's repository
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the review prompt for the configured diff file
    Prompt,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("loading configuration");
    let config = match &cli.config {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load(&cli.workspace)?,
    };
    debug!(file_name = config.file_name(), remote = config.remote(), "configuration loaded");

    let reviewer = review::Reviewer::new(&cli.workspace, config);

    match cli.command {
        Command::Branches { target } => {
            let listed = branches::list_branches(reviewer.vcs()).await?;
            if target {
                let remote = reviewer.config().remote();
                for branch in branches::prioritize_branches(&listed, remote, branches::PINNED_TARGET_BRANCHES) {
                    if is_pinned(&branch, remote) {
                        println!("{}", branch.bold());
                    } else {
                        println!("{branch}");
                    }
                }
            } else {
                for branch in listed {
                    println!("{branch}");
                }
            }
        }
        Command::Diff { source, target } => {
            let summary = reviewer.diff_branches(&source, &target).await?;
            print_ready(&reviewer, &summary);
        }
        Command::Review { url, yes } => {
            let mut confirm = |question: &str| yes || ask(question);
            let summary = reviewer.review_pull_request(&url, &mut confirm).await?;
            print_ready(&reviewer, &summary);
        }
        Command::Prompt => {
            let config = reviewer.config();
            print!("{}", prompt::build_prompt(config.prompt_template(), config.file_name()));
        }
    }

    Ok(())
}

fn is_pinned(branch: &str, remote: &str) -> bool {
    let name = branch
        .strip_prefix(remote)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(branch);
    branches::PINNED_TARGET_BRANCHES.contains(&name)
}

fn ask(question: &str) -> bool {
    eprint!("{question} [y/N] ");
    std::io::stderr().flush().ok();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_ready(reviewer: &review::Reviewer, summary: &DiffSummary) {
    let config = reviewer.config();
    let prompt = prompt::build_prompt(config.prompt_template(), config.file_name());

    println!(
        "{} {} ({}, {} bytes)",
        "Diff ready:".green().bold(),
        summary.path.display(),
        summary.range,
        summary.diff_bytes
    );
    println!();
    println!("{}", prompt::review_request(config.file_name(), &prompt));
}
