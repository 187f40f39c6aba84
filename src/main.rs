use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::info;

use memory_tree::binding::{Binding, BindingOptions};
use memory_tree::config::{load_config, validate_config, Config, ConfigLoader};
use memory_tree::memory::{BufferMemory, MemoryAccessor, Protection};
use memory_tree::render::{render, RenderOptions};
use memory_tree::schema::SchemaRegistry;
use memory_tree::{logging, Address};

/// Inspect and edit live memory as a typed tree
#[derive(Parser, Debug)]
#[command(name = "memory-tree", version, about)]
struct Cli {
    /// Schema registry file (JSON, or TOML by extension)
    #[arg(long)]
    schemas: PathBuf,

    /// Root schema to bind
    #[arg(long)]
    schema: String,

    /// Base address of the root struct
    #[arg(long, value_parser = parse_address)]
    address: Address,

    /// Attach to a live process
    #[arg(long, conflicts_with = "dump")]
    pid: Option<u32>,

    /// Inspect a raw memory dump instead of a process
    #[arg(long, requires = "dump_base")]
    dump: Option<PathBuf>,

    /// Address the first byte of the dump was taken from
    #[arg(long, value_parser = parse_address)]
    dump_base: Option<Address>,

    /// Configuration file (defaults to ./memory-tree.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a value before the first refresh, e.g. `--set player.hp=100`
    #[arg(long = "set", value_name = "PATH=VALUE", action = ArgAction::Append)]
    assignments: Vec<String>,

    /// Print the tree once and exit
    #[arg(long)]
    once: bool,

    /// Show the bytes currently in memory behind each scalar
    #[arg(long)]
    hex: bool,
}

fn parse_address(s: &str) -> Result<Address, String> {
    s.parse::<Address>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::new(path)
            .load()
            .with_context(|| format!("loading {}", path.display()))?,
        None => load_config()?,
    };
    validate_config(&config)?;
    logging::init_logging(&config.logging)?;

    info!("Starting memory-tree v{}", env!("CARGO_PKG_VERSION"));

    let registry = SchemaRegistry::load(&cli.schemas)
        .with_context(|| format!("loading schemas from {}", cli.schemas.display()))?;

    match (cli.pid, &cli.dump, cli.dump_base) {
        (Some(pid), _, _) => attach(&cli, &config, &registry, pid).await,
        (None, Some(dump), Some(base)) => {
            let memory = BufferMemory::from_dump(dump, base, Protection::read_write())
                .with_context(|| format!("loading dump {}", dump.display()))?;
            run(&cli, &config, &registry, memory).await
        }
        _ => bail!("one of --pid or --dump with --dump-base is required"),
    }
}

#[cfg(target_os = "linux")]
async fn attach(cli: &Cli, config: &Config, registry: &SchemaRegistry, pid: u32) -> Result<()> {
    let handle = memory_tree::process::ProcessHandle::open(pid)
        .with_context(|| format!("opening process {}", pid))?;
    run(cli, config, registry, handle).await
}

#[cfg(not(target_os = "linux"))]
async fn attach(_: &Cli, _: &Config, _: &SchemaRegistry, _: u32) -> Result<()> {
    bail!("--pid is only supported on Linux; use --dump instead")
}

async fn run<M: MemoryAccessor>(
    cli: &Cli,
    config: &Config,
    registry: &SchemaRegistry,
    memory: M,
) -> Result<()> {
    let mut binding = Binding::open(
        registry,
        &cli.schema,
        cli.address,
        memory,
        BindingOptions::from(&config.engine),
    )
    .with_context(|| format!("binding {} at {}", cli.schema, cli.address))?;

    for assignment in &cli.assignments {
        let (path, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("expected PATH=VALUE, got '{}'", assignment))?;
        let id = binding.find(path.trim())?;
        binding
            .write_text(id, value.trim())
            .with_context(|| format!("writing {}", assignment))?;
        info!(path, value, "value assigned");
    }

    let options = RenderOptions::default().with_hex(cli.hex);
    if cli.once {
        print!("{}", render(&binding, &options));
        binding.close();
        return Ok(());
    }

    let mut interval = tokio::time::interval(config.refresh.interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let generation = binding.tick();
                println!("-- generation {} --", generation);
                print!("{}", render(&binding, &options));
            }
            _ = &mut shutdown => {
                info!("Shutting down memory-tree");
                break;
            }
        }
    }

    binding.close();
    Ok(())
}
