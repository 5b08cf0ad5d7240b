//! unityctl - command-line access to a Unity storage array
//!
//! Connection settings come from a TOML file and `UNITY_*` environment
//! variables (environment wins).

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use unity_client::{
    Client, CreateLunOptions, DeleteOutcome, FilesystemAccessType, TieringPolicy,
};
use unity_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, LoggingConfig,
    UnityConfig,
};

#[derive(Parser)]
#[command(name = "unityctl")]
#[command(about = "Manage snapshots, volumes and filesystems on a Unity array")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show model and software version of the array (no login needed)
    SystemInfo,

    /// Check that the configured credentials are accepted
    Login,

    /// Snapshot operations
    Snapshot {
        #[command(subcommand)]
        action: SnapshotCommand,
    },

    /// Volume operations
    Volume {
        #[command(subcommand)]
        action: VolumeCommand,
    },

    /// Filesystem operations
    Filesystem {
        #[command(subcommand)]
        action: FilesystemCommand,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

/// Select a resource by id or by name
#[derive(Args)]
#[group(required = true, multiple = false)]
struct Lookup {
    #[arg(long)]
    id: Option<String>,

    #[arg(long)]
    name: Option<String>,
}

#[derive(Subcommand)]
enum SnapshotCommand {
    /// Snapshot a storage resource
    Create {
        storage_resource_id: String,
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Retention as days:hours:minutes:seconds
        #[arg(short, long, default_value = "")]
        retention: String,

        /// Access type for filesystem snapshots
        #[arg(long, value_enum)]
        access_type: Option<AccessTypeArg>,
    },

    Get {
        #[command(flatten)]
        lookup: Lookup,
    },

    List {
        /// Only snapshots of this storage resource
        #[arg(long, default_value = "")]
        source: String,

        #[arg(long, default_value = "")]
        snapshot_id: String,

        /// Page index
        #[arg(long, default_value = "0")]
        start: u32,

        /// Page size, 0 lists everything
        #[arg(long, default_value = "0")]
        max: u32,
    },

    Delete { id: String },

    Copy { source_id: String, name: String },
}

#[derive(Subcommand)]
enum VolumeCommand {
    /// Create a volume
    Create {
        name: String,
        pool_id: String,

        /// Size in bytes
        size: u64,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(long)]
        thin: bool,

        #[arg(long)]
        data_reduction: bool,

        #[arg(long, value_enum)]
        tiering: Option<TieringArg>,

        /// Host I/O limit policy id
        #[arg(long)]
        io_limit: Option<String>,
    },

    Get {
        #[command(flatten)]
        lookup: Lookup,
    },

    List {
        #[arg(long, default_value = "0")]
        start: u32,

        #[arg(long, default_value = "0")]
        max: u32,
    },

    /// Grow a volume to a new size in bytes
    Expand { id: String, size: u64 },

    Delete { id: String },
}

#[derive(Subcommand)]
enum FilesystemCommand {
    Get {
        #[command(flatten)]
        lookup: Lookup,
    },

    /// Delete a filesystem, or mark it when snapshots remain
    Delete { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum AccessTypeArg {
    Checkpoint,
    Protocol,
}

impl From<AccessTypeArg> for FilesystemAccessType {
    fn from(arg: AccessTypeArg) -> Self {
        match arg {
            AccessTypeArg::Checkpoint => FilesystemAccessType::Checkpoint,
            AccessTypeArg::Protocol => FilesystemAccessType::Protocol,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TieringArg {
    AutotierHigh,
    Autotier,
    Highest,
    Lowest,
}

impl From<TieringArg> for TieringPolicy {
    fn from(arg: TieringArg) -> Self {
        match arg {
            TieringArg::AutotierHigh => TieringPolicy::AutotierHigh,
            TieringArg::Autotier => TieringPolicy::Autotier,
            TieringArg::Highest => TieringPolicy::Highest,
            TieringArg::Lowest => TieringPolicy::Lowest,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, source) = load_config(cli.config.as_ref())?;

    let logging_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        config.logging.clone()
    };
    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting unityctl v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("No configuration file found, using environment only"),
    }

    match cli.command {
        Commands::Config {
            show,
            init,
            validate,
        } => handle_config(&config, show, init, validate),
        Commands::SystemInfo => {
            let client = Client::from_settings(&config.client_settings())?;
            print_json(&client.basic_system_info().await?)
        }
        Commands::Login => {
            let client = connect(&config).await?;
            println!("Logged in to {}", client.endpoint().await);
            finish(&client, Ok(())).await
        }
        Commands::Snapshot { action } => {
            let client = connect(&config).await?;
            let result = handle_snapshot(&client, action).await;
            finish(&client, result).await
        }
        Commands::Volume { action } => {
            let client = connect(&config).await?;
            let result = handle_volume(&client, action).await;
            finish(&client, result).await
        }
        Commands::Filesystem { action } => {
            let client = connect(&config).await?;
            let result = handle_filesystem(&client, action).await;
            finish(&client, result).await
        }
    }
}

/// Settings file plus environment overrides, with the file it came from
fn load_config(config_path: Option<&PathBuf>) -> anyhow::Result<(UnityConfig, Option<PathBuf>)> {
    let found = match config_path {
        Some(path) => Some(path.clone()),
        None => default_config_paths().into_iter().find(|p| p.exists()),
    };

    let mut config = match &found {
        Some(path) => UnityConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => UnityConfig::default(),
    };
    config.apply_env_overrides();

    Ok((config, found))
}

fn default_config_paths() -> Vec<PathBuf> {
    [
        dirs::config_dir().map(|d| d.join("unity").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".unity").join("config.toml")),
        Some(PathBuf::from("unity.toml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

async fn connect(config: &UnityConfig) -> anyhow::Result<Client> {
    config.validate()?;
    let client = Client::from_settings(&config.client_settings())?;

    log_operation_start!("login", endpoint = %config.connection.endpoint);
    if let Err(e) = client.authenticate(&config.connection).await {
        log_operation_error!("login", e, endpoint = %config.connection.endpoint);
        return Err(e.into());
    }
    log_operation_success!("login", endpoint = %config.connection.endpoint);

    Ok(client)
}

/// End the array session, keeping the command's own result
async fn finish(client: &Client, result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(e) = client.logout().await {
        warn!(error = %e, "Failed to end the array session");
    }
    result
}

async fn handle_snapshot(client: &Client, action: SnapshotCommand) -> anyhow::Result<()> {
    let snapshots = client.snapshots();
    match action {
        SnapshotCommand::Create {
            storage_resource_id,
            name,
            description,
            retention,
            access_type,
        } => {
            let snapshot = match access_type {
                Some(access_type) => {
                    snapshots
                        .create_snapshot_with_fs_access_type(
                            &storage_resource_id,
                            &name,
                            &description,
                            &retention,
                            access_type.into(),
                        )
                        .await?
                }
                None => {
                    snapshots
                        .create_snapshot(&storage_resource_id, &name, &description, &retention)
                        .await?
                }
            };
            print_json(&snapshot)
        }
        SnapshotCommand::Get { lookup } => {
            let snapshot = match (lookup.id, lookup.name) {
                (Some(id), _) => snapshots.find_snapshot_by_id(&id).await?,
                (None, Some(name)) => snapshots.find_snapshot_by_name(&name).await?,
                (None, None) => bail!("either --id or --name is required"),
            };
            print_json(&snapshot)
        }
        SnapshotCommand::List {
            source,
            snapshot_id,
            start,
            max,
        } => {
            let (list, next_token) = snapshots
                .list_snapshots(start, max, &source, &snapshot_id)
                .await?;
            print_json(&serde_json::json!({ "snapshots": list, "nextToken": next_token }))
        }
        SnapshotCommand::Delete { id } => {
            snapshots.delete_snapshot(&id).await?;
            println!("Deleted snapshot {}", id);
            Ok(())
        }
        SnapshotCommand::Copy { source_id, name } => {
            print_json(&snapshots.copy_snapshot(&source_id, &name).await?)
        }
    }
}

async fn handle_volume(client: &Client, action: VolumeCommand) -> anyhow::Result<()> {
    let volumes = client.volumes();
    match action {
        VolumeCommand::Create {
            name,
            pool_id,
            size,
            description,
            thin,
            data_reduction,
            tiering,
            io_limit,
        } => {
            let options = CreateLunOptions {
                description,
                tiering_policy: tiering.map(Into::into),
                host_io_limit_id: io_limit,
                is_thin: thin,
                is_data_reduction: data_reduction,
            };
            print_json(&volumes.create_lun(&name, &pool_id, size, &options).await?)
        }
        VolumeCommand::Get { lookup } => {
            let volume = match (lookup.id, lookup.name) {
                (Some(id), _) => volumes.find_volume_by_id(&id).await?,
                (None, Some(name)) => volumes.find_volume_by_name(&name).await?,
                (None, None) => bail!("either --id or --name is required"),
            };
            print_json(&volume)
        }
        VolumeCommand::List { start, max } => {
            let (list, next_token) = volumes.list_volumes(start, max).await?;
            print_json(&serde_json::json!({ "volumes": list, "nextToken": next_token }))
        }
        VolumeCommand::Expand { id, size } => {
            volumes.expand_volume(&id, size).await?;
            println!("Volume {} is {} bytes", id, size);
            Ok(())
        }
        VolumeCommand::Delete { id } => {
            volumes.delete_volume(&id).await?;
            println!("Deleted volume {}", id);
            Ok(())
        }
    }
}

async fn handle_filesystem(client: &Client, action: FilesystemCommand) -> anyhow::Result<()> {
    let filesystems = client.filesystems();
    match action {
        FilesystemCommand::Get { lookup } => {
            let fs = match (lookup.id, lookup.name) {
                (Some(id), _) => filesystems.find_filesystem_by_id(&id).await?,
                (None, Some(name)) => filesystems.find_filesystem_by_name(&name).await?,
                (None, None) => bail!("either --id or --name is required"),
            };
            print_json(&fs)
        }
        FilesystemCommand::Delete { id } => {
            match filesystems.delete_filesystem(&id).await? {
                DeleteOutcome::Deleted => println!("Deleted filesystem {}", id),
                DeleteOutcome::MarkedForDeletion => println!(
                    "Filesystem {} still has snapshots; marked for deletion with the last one",
                    id
                ),
            }
            Ok(())
        }
    }
}

fn handle_config(config: &UnityConfig, show: bool, init: bool, validate: bool) -> anyhow::Result<()> {
    if init {
        let path = default_config_paths()
            .into_iter()
            .next()
            .context("No configuration directory available")?;
        if path.exists() {
            bail!("Configuration already exists at {:?}", path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        UnityConfig::default().save_to_file(&path)?;
        println!("Configuration initialized at: {:?}", path);
        println!("Edit the file to set the array endpoint and credentials.");
    }

    if show {
        let mut shown = config.clone();
        if !shown.connection.password.is_empty() {
            shown.connection.password = "********".to_string();
        }
        println!("{}", toml::to_string_pretty(&shown)?);
    }

    if validate {
        config.validate()?;
        println!("Configuration is valid");
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
