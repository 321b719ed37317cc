use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use gitstamp::catalog::Catalog;
use gitstamp::config::{DEFAULT_FILE_NAME, Policy};
use gitstamp::error::Error;
use gitstamp::format::OutputFormat;
use gitstamp::{default_classifier, resolve, telemetry};
use gitstamp_git::{GitOid, GixRepo, Repository};

/// Deterministic versions from git history
///
/// Computes the version of a commit from the repository's version tags and
/// the commit's ancestry. A commit tagged with a legal next version gets
/// that version; any other commit gets a CI pseudo-version for its branch,
/// as configured in gitstamp.toml.
///
/// EXAMPLES:
///
///   gitstamp                       # version of HEAD
///   gitstamp --format json         # full result for a pipeline
///   gitstamp --branch develop      # version of develop's tip
///   gitstamp tags                  # list the version tags
///
/// Exits with status 1 when no version could be computed.
#[derive(Parser)]
#[command(name = "gitstamp")]
#[command(version, about)]
#[command(args_conflicts_with_subcommands = true)]
#[command(after_help = "See 'gitstamp <command> --help' for more information on a specific command.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    resolve: ResolveArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the version of a commit (default)
    Resolve(ResolveArgs),

    /// List the version tags the resolver sees
    ///
    /// Shows each version with the tag name kept for it and the tagged
    /// commit, then the commits whose tags conflict.
    Tags(RepoArgs),
}

#[derive(Args, Clone)]
struct RepoArgs {
    /// Run as if started in <PATH>
    #[arg(short = 'C', value_name = "PATH", default_value = ".")]
    dir: PathBuf,

    /// Policy file (default: gitstamp.toml at the repository root)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args, Clone)]
struct ResolveArgs {
    #[command(flatten)]
    repo: RepoArgs,

    /// Resolve this commit instead of HEAD (sha, tag or branch)
    #[arg(long, value_name = "REV")]
    commit: Option<String>,

    /// Resolve the tip of this branch and use it for CI versions
    #[arg(long, value_name = "NAME")]
    branch: Option<String>,

    /// Do not fail on uncommitted changes
    #[arg(long)]
    ignore_dirty: bool,
}

fn main() -> Result<ExitCode> {
    telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Resolve(args)) => run_resolve(&args),
        Some(Commands::Tags(args)) => run_tags(&args),
        None => run_resolve(&cli.resolve),
    }
}

fn open(args: &RepoArgs) -> Result<(GixRepo, Policy)> {
    let repo = GixRepo::open(&args.dir)
        .with_context(|| format!("cannot open a git repository at {}", args.dir.display()))?;
    let path = args.config.clone().unwrap_or_else(|| {
        repo.workdir()
            .unwrap_or_else(|| Path::new("."))
            .join(DEFAULT_FILE_NAME)
    });
    let policy = Policy::load(&path)?;
    Ok((repo, policy))
}

fn run_resolve(args: &ResolveArgs) -> Result<ExitCode> {
    let (repo, mut policy) = open(&args.repo)?;
    if let Some(commit) = &args.commit {
        policy.starting_commit = Some(commit.clone());
    }
    if let Some(branch) = &args.branch {
        policy.starting_branch = Some(branch.clone());
    }
    if args.ignore_dirty {
        policy.ignore_dirty_working_folder = true;
    }

    let result = resolve(&repo, &policy, &default_classifier).context("cannot read the repository")?;
    println!("{}", args.repo.format.result(&result)?.trim_end());
    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_tags(args: &RepoArgs) -> Result<ExitCode> {
    let (repo, policy) = open(args)?;
    let starting = policy.starting_version()?;
    let head = repo.head()?.unwrap_or(GitOid::ZERO);
    let catalog = match Catalog::build(&repo, &policy, starting.as_ref(), head) {
        Ok(catalog) => catalog,
        Err(Error::Resolve(err)) => return Err(err.into()),
        Err(Error::Git(err)) => return Err(err).context("cannot read the repository"),
    };
    println!("{}", args.format.catalog(&catalog)?.trim_end());
    Ok(if catalog.conflicts().is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
