//! Block atlas CLI
//!
//! Subcommands:
//!   run     Build the atlas, then serve the client assets (default)
//!   build   Stack the configured textures into atlas PNG + JSON
//!   serve   Serve the client assets without rebuilding
//!   inspect Summary of an existing atlas
//!   hotbar  Print the generated hotbar HTML
//!
//! Example:
//!   cargo run -- --config assets/config/atlas.ron build --tile-size 16

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use block_atlas::{
    atlas,
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    hotbar, server,
};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "block_atlas", author, version, about = "Build the block texture atlas and serve the client", long_about = None)]
struct Cli {
    /// RON config layer; repeat to layer files, later ones override earlier ones.
    /// Defaults to assets/config/atlas.ron when present.
    #[arg(long = "config", global = true)]
    config: Vec<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the atlas and then serve (what runs with no subcommand)
    Run(ServeArgs),
    /// Build the atlas PNG (+ JSON manifest)
    Build(BuildArgs),
    /// Serve static mounts and the hotbar page without rebuilding
    Serve(ServeArgs),
    /// Inspect an existing atlas PNG (and optional manifest)
    Inspect(InspectArgs),
    /// Print the hotbar HTML snippet
    Hotbar,
}

#[derive(Args, Debug, Default)]
struct BuildArgs {
    #[arg(long)] tile_size: Option<u32>,
    #[arg(long)] output: Option<PathBuf>,
    /// Skip writing the JSON manifest
    #[arg(long)] no_manifest: bool,
    /// Also print the manifest to stdout
    #[arg(long)] stdout_json: bool,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override server.bind (`host:port` or `:port`)
    #[arg(long)] bind: Option<String>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    #[arg(long)] atlas: PathBuf,
    #[arg(long)] manifest: Option<PathBuf>,
}

fn init_logging(verbose: bool, no_color: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install logger: {e}"))
}

fn load_config(layers: &[PathBuf]) -> Result<AppConfig> {
    let layers: Vec<PathBuf> = if layers.is_empty() && Path::new(DEFAULT_CONFIG_PATH).exists() {
        vec![PathBuf::from(DEFAULT_CONFIG_PATH)]
    } else {
        layers.to_vec()
    };
    if layers.is_empty() {
        info!("no config file; using built-in defaults");
        return Ok(AppConfig::default());
    }
    let (cfg, used, errors) = AppConfig::load_layered(&layers);
    if !errors.is_empty() {
        bail!("config errors:\n  {}", errors.join("\n  "));
    }
    info!("config layers: {}", used.join(", "));
    for w in cfg.validate() {
        warn!("config: {w}");
    }
    Ok(cfg)
}

fn cmd_build(cfg: &mut AppConfig, a: BuildArgs) -> Result<()> {
    if let Some(t) = a.tile_size { cfg.atlas.tile_size = t; }
    if let Some(o) = a.output { cfg.atlas.output = o; }
    if a.no_manifest { cfg.atlas.manifest = None; }
    let artifact = atlas::build_atlas(&cfg.atlas).context("build atlas")?;
    atlas::write_outputs(&artifact, &cfg.atlas).context("write atlas")?;
    if a.stdout_json {
        println!("{}", serde_json::to_string_pretty(&artifact.manifest)?);
    }
    Ok(())
}

async fn cmd_serve(cfg: &mut AppConfig, a: ServeArgs) -> Result<()> {
    if let Some(b) = a.bind { cfg.server.bind = b; }
    server::serve(&cfg.server, &cfg.atlas.textures).await.context("serve")?;
    Ok(())
}

fn cmd_inspect(a: InspectArgs) -> Result<()> {
    let res = atlas::inspect(&a.atlas, a.manifest.as_deref())
        .with_context(|| format!("inspect {}", a.atlas.display()))?;
    println!("Atlas: {}x{} tilesize={} tiles={}", res.atlas_dim.0, res.atlas_dim.1, res.tile_size, res.tile_count);
    if let Some(names) = res.names {
        for (i, name) in names.iter().enumerate() {
            println!("  {i:>2} {name}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.no_color)?;

    match cli.command.unwrap_or(Commands::Run(ServeArgs::default())) {
        Commands::Run(a) => {
            let mut cfg = load_config(&cli.config)?;
            cmd_build(&mut cfg, BuildArgs::default())?;
            cmd_serve(&mut cfg, a).await
        }
        Commands::Build(a) => cmd_build(&mut load_config(&cli.config)?, a),
        Commands::Serve(a) => cmd_serve(&mut load_config(&cli.config)?, a).await,
        Commands::Inspect(a) => cmd_inspect(a),
        Commands::Hotbar => {
            let cfg = load_config(&cli.config)?;
            println!("{}", hotbar::render_hotbar(&cfg.atlas.textures, &cfg.server.hotbar_src_prefix));
            Ok(())
        }
    }
}
