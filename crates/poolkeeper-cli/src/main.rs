use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "poolkeeper",
    about = "Pool keeper — worker slot registry and cluster allocator",
    version,
    propagate_version = true
)]
struct Cli {
    /// Configuration file (default: ./poolkeeper.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Slot registry snapshot. Overrides [registry].path from the config.
    #[arg(long, global = true)]
    pool_file: Option<PathBuf>,
    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered slot
    List,
    /// Show a single slot
    Get {
        id: u32,
    },
    /// Register a worker slot
    Add {
        #[arg(long)]
        hostname: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        datadir: String,
        /// Capacity ceiling used for load-factor calculations
        #[arg(long)]
        maxload: u32,
    },
    /// Remove the slot at a host and data directory
    Remove {
        #[arg(long)]
        hostname: String,
        #[arg(long)]
        datadir: String,
    },
    /// Allocate a coordinator plus executors.
    ///
    /// Executors named with --executor are used as given unless they are
    /// badly overloaded; --count adds executors chosen by load.
    Allocate {
        #[arg(long)]
        coordinator: u32,
        /// Slot id for an executor (repeatable)
        #[arg(long = "executor")]
        executors: Vec<u32>,
        /// Number of additional executors chosen by load
        #[arg(long, default_value = "0")]
        count: usize,
        /// Show the assignment without charging load
        #[arg(long)]
        dry_run: bool,
    },
    /// Return a cluster's executors to the pool
    Release {
        #[arg(long)]
        coordinator: u32,
        /// Slot id of a released executor (repeatable)
        #[arg(long = "executor", required = true)]
        executors: Vec<u32>,
    },
    /// Run a boundary operation with a raw JSON payload
    Call {
        /// list-slots, get-slot, add-slot, remove-slot, allocate-cluster, release-cluster
        operation: String,
        /// JSON request body
        #[arg(default_value = "{}")]
        payload: String,
    },
    /// Write an instance manifest for a host
    MakeConf {
        #[arg(long)]
        hostname: String,
        /// Instance i listens on base-port + i + 2
        #[arg(long)]
        base_port: u16,
        #[arg(long)]
        number: u32,
        #[arg(long)]
        maxload: u32,
        /// Directory that holds datadirs/vmpool/
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(short, long, default_value = "instances.json")]
        output: PathBuf,
    },
    /// Register every slot listed in an instance manifest
    Import {
        manifest: PathBuf,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,poolkeeper=debug"));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    let opts = commands::Options {
        config: cli.config,
        pool_file: cli.pool_file,
    };

    match cli.command {
        Commands::List => commands::slots::list(&opts),
        Commands::Get { id } => commands::slots::get(&opts, id),
        Commands::Add {
            hostname,
            port,
            datadir,
            maxload,
        } => commands::slots::add(&opts, hostname, port, datadir, maxload),
        Commands::Remove { hostname, datadir } => {
            commands::slots::remove(&opts, hostname, datadir)
        }
        Commands::Allocate {
            coordinator,
            executors,
            count,
            dry_run,
        } => commands::cluster::allocate(&opts, coordinator, &executors, count, dry_run),
        Commands::Release {
            coordinator,
            executors,
        } => commands::cluster::release(&opts, coordinator, &executors),
        Commands::Call { operation, payload } => {
            commands::call::call(&opts, &operation, &payload)
        }
        Commands::MakeConf {
            hostname,
            base_port,
            number,
            maxload,
            root,
            output,
        } => commands::manifest::make_conf(
            poolkeeper_core::ManifestSpec {
                hostname,
                root,
                base_port,
                number,
                maxload,
            },
            &output,
        ),
        Commands::Import { manifest } => commands::manifest::import(&opts, &manifest),
    }
}
