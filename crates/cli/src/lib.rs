//! # Asset Pack CLI
//!
//! Command-line front end over the asset packing crates.
//!
//! ```text
//! assetpack pack    globs -> explicit files ─┬─> Packer (blocking task)
//!                   sidecars -> AssetIndex ──┴─> DependencyResolver -> Packer
//! assetpack unpack  package -> Unpacker -> files under --dest
//! assetpack list    package -> Unpacker -> GUID + pathname per entry
//! assetpack deps    files -> DependencyResolver query -> paths or GUIDs
//! ```
//!
//! Logs go to stderr; stdout carries results only (JSON with `--json`).

use anyhow::{Context, Result};
use assetpack_graph::{CancellationToken, DependencyResolver};
use assetpack_package::Unpacker;
use assetpack_protocol::{serialize_json_pretty, PackConfig};
use clap::{Args, Parser, Subcommand};
use flags::VerbosityFlag;
use report::{DepsQuery, DepsReport, ListReport, ListedEntry, UnpackReport};
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

mod config;
mod flags;
mod report;
mod session;

pub use config::{ConfigOverrides, LoadedConfig};
pub use session::{Session, SessionReport};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "assetpack")]
#[command(
    about = "Pack asset projects into GUID-keyed packages, following asset references",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Log level (overrides RUST_LOG and the config file)
    #[arg(long, global = true, value_enum)]
    verbosity: Option<VerbosityFlag>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack matched files and everything they reference
    Pack(PackArgs),

    /// Extract a package into a directory
    Unpack(UnpackArgs),

    /// List the entries of a package
    List(ListArgs),

    /// Query dependencies or dependents of files
    Deps(DepsArgs),
}

#[derive(Args)]
struct PackArgs {
    /// Project root (default: the current directory or `source_root` from the config file)
    #[arg(short = 'i', long = "project")]
    project: Option<PathBuf>,

    /// Package to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include globs, relative to the project root
    #[arg(short, long, value_delimiter = ',', num_args = 1..)]
    assets: Vec<String>,

    /// Exclude globs, relative to the project root
    #[arg(short, long, value_delimiter = ',', num_args = 1..)]
    exclude: Vec<String>,

    /// Pack matched files only, without following references
    #[arg(long)]
    skip_dependencies: bool,

    /// Sub-directory of the project whose sidecars are indexed
    #[arg(long)]
    asset_root: Option<String>,

    /// Packages extracted into the project before packing
    #[arg(short, long, value_delimiter = ',')]
    unpack: Vec<PathBuf>,

    /// JSON map of script file -> script files it references
    #[arg(long)]
    script_references: Option<PathBuf>,

    /// TOML configuration file (default: assetpack.toml in the project root, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct UnpackArgs {
    /// Package to extract
    archive: PathBuf,

    /// Destination directory
    #[arg(short, long, default_value = ".")]
    dest: PathBuf,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ListArgs {
    /// Package to read
    archive: PathBuf,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DepsArgs {
    /// Files to query, relative to the project root
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Project root
    #[arg(short = 'i', long = "project", default_value = ".")]
    project: PathBuf,

    /// Sub-directory of the project whose sidecars are indexed
    #[arg(long, default_value = "Assets")]
    asset_root: String,

    /// Files that reference the targets instead of files the targets reference
    #[arg(long)]
    reverse: bool,

    /// Follow references transitively
    #[arg(long)]
    deep: bool,

    /// Report GUIDs, including ones no indexed file owns
    #[arg(long, conflicts_with = "reverse")]
    guids: bool,

    /// JSON map of script file -> script files it references (deep file queries)
    #[arg(long)]
    script_references: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Pack(args) => args.json,
        Commands::Unpack(args) => args.json,
        Commands::List(args) => args.json,
        Commands::Deps(args) => args.json,
    };

    // Pack reads its config before logging starts so the file can choose the level; errors
    // surface after the logger is up.
    let loaded = match &cli.command {
        Commands::Pack(args) => Some(load_pack_config(args)),
        _ => None,
    };
    let file_verbosity = loaded
        .as_ref()
        .and_then(|result| result.as_ref().ok())
        .filter(|loaded| loaded.file.is_some())
        .map(|loaded| loaded.config.verbosity);

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet || json_output {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else if let Some(level) = cli.verbosity.map(VerbosityFlag::as_domain).or(file_verbosity) {
        builder.filter_level(level.as_level_filter());
    }
    builder.target(env_logger::Target::Stderr).init();

    let loaded = loaded.transpose()?;
    match cli.command {
        Commands::Pack(args) => run_pack(args, loaded).await?,
        Commands::Unpack(args) => run_unpack(args).await?,
        Commands::List(args) => run_list(args).await?,
        Commands::Deps(args) => run_deps(args).await?,
    }

    Ok(())
}

fn load_pack_config(args: &PackArgs) -> Result<LoadedConfig> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let overrides = ConfigOverrides {
        source_root: args.project.clone(),
        output: args.output.clone(),
        assets: args.assets.clone(),
        exclude: args.exclude.clone(),
        skip_dependency_analysis: args.skip_dependencies,
        asset_root: args.asset_root.clone(),
        unpack: args.unpack.clone(),
        script_references: args.script_references.clone(),
    };
    config::load(args.config.as_deref(), overrides, &cwd)
}

/// Cancel `token` on Ctrl-C so long runs stop with what they have.
fn cancel_on_interrupt(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; stopping after the current file");
            token.cancel();
        }
    });
}

async fn run_pack(args: PackArgs, loaded: Option<LoadedConfig>) -> Result<()> {
    let loaded = match loaded {
        Some(loaded) => loaded,
        None => load_pack_config(&args)?,
    };
    if let Some(file) = &loaded.file {
        log::info!("Using config {}", file.display());
    }

    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);
    let report = Session::new(loaded.config)
        .with_cancellation(cancel)
        .run()
        .await?;

    if args.json {
        print_stdout(&serialize_json_pretty(&report)?)?;
    } else {
        print_stdout(&report::render_session(&report))?;
    }
    Ok(())
}

async fn run_unpack(args: UnpackArgs) -> Result<()> {
    std::fs::create_dir_all(&args.dest)
        .with_context(|| format!("Failed to create {}", args.dest.display()))?;

    let archive = args.archive.clone();
    let dest = args.dest.clone();
    let stats = tokio::task::spawn_blocking(move || Unpacker::open(&archive)?.extract_to(&dest))
        .await
        .context("Unpack task failed")?
        .with_context(|| format!("Failed to unpack {}", args.archive.display()))?;

    if args.json {
        let report = UnpackReport {
            archive: args.archive,
            destination: args.dest,
            stats,
        };
        print_stdout(&serialize_json_pretty(&report)?)?;
    } else {
        print_stdout(&format!(
            "Unpacked {} assets into {} ({} skipped, {} incomplete)",
            stats.entries,
            args.dest.display(),
            stats.skipped,
            stats.incomplete
        ))?;
    }
    Ok(())
}

async fn run_list(args: ListArgs) -> Result<()> {
    let archive = args.archive.clone();
    let (entries, stats) = tokio::task::spawn_blocking(move || {
        let mut entries = Vec::new();
        let stats = Unpacker::open(&archive)?.for_each_entry(|guid, entry| {
            entries.push(ListedEntry {
                guid: guid.to_string(),
                pathname: entry.pathname.unwrap_or_default(),
                size: entry.content.map_or(0, |content| content.len()),
            });
            Ok(())
        })?;
        Ok::<_, assetpack_package::PackageError>((entries, stats))
    })
    .await
    .context("List task failed")?
    .with_context(|| format!("Failed to read {}", args.archive.display()))?;

    if args.json {
        let report = ListReport {
            archive: args.archive,
            entries,
            stats,
        };
        print_stdout(&serialize_json_pretty(&report)?)?;
    } else {
        for entry in &entries {
            print_stdout(&format!("{}\t{}", entry.guid, entry.pathname))?;
        }
    }
    Ok(())
}

async fn run_deps(args: DepsArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let root = cwd
        .join(&args.project)
        .canonicalize()
        .with_context(|| format!("Invalid project path {}", args.project.display()))?;

    let targets = args
        .files
        .iter()
        .map(|file| {
            root.join(file)
                .canonicalize()
                .with_context(|| format!("File not found: {}", file.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let config = PackConfig {
        source_root: root.clone(),
        asset_root: args.asset_root.clone(),
        ..PackConfig::default()
    };
    let (index, _) = session::build_index(&config.asset_root_dir()).await?;
    let resolver = DependencyResolver::new(&index);
    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);

    let query = DepsQuery::from_flags(args.reverse, args.deep, args.guids);
    let paths = |set: BTreeSet<PathBuf>| -> Vec<String> {
        set.iter().map(|path| report::display_path(&root, path)).collect()
    };
    let guids = |set: BTreeSet<assetpack_reference::Guid>| -> Vec<String> {
        set.into_iter().map(|guid| guid.into_string()).collect()
    };

    let (items, cancelled) = match query {
        DepsQuery::Files => {
            let mut all = BTreeSet::new();
            for target in &targets {
                all.extend(resolver.file_dependencies(target).await?);
            }
            (paths(all), false)
        }
        DepsQuery::Guids => {
            let mut all = BTreeSet::new();
            for target in &targets {
                all.extend(resolver.guid_dependencies(target).await?);
            }
            (guids(all), false)
        }
        DepsQuery::DeepFiles => {
            let oracle =
                session::load_oracle(args.script_references.as_deref(), &root).await?;
            let closure = resolver.resolve(&targets, oracle.as_ref(), &cancel).await?;
            (paths(closure.items), closure.cancelled)
        }
        DepsQuery::DeepGuids => {
            let closure = resolver.deep_guid_dependencies(&targets, &cancel).await?;
            (guids(closure.items), closure.cancelled)
        }
        DepsQuery::Dependents => {
            let mut all = BTreeSet::new();
            for target in &targets {
                all.extend(resolver.dependents(target).await?);
            }
            (paths(all), false)
        }
        DepsQuery::DeepDependents => {
            let closure = resolver.deep_dependents(&targets, &cancel).await?;
            (paths(closure.items), closure.cancelled)
        }
    };

    if args.json {
        let report = DepsReport {
            query,
            targets: targets
                .iter()
                .map(|target| report::display_path(&root, target))
                .collect(),
            items,
            cancelled,
        };
        print_stdout(&serialize_json_pretty(&report)?)?;
    } else {
        for item in &items {
            print_stdout(item)?;
        }
    }
    Ok(())
}
