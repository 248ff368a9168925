//! CST Parent CLI - find and control child screen-time devices.

mod commands;
mod ui;

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use cst_core::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cst-parent")]
#[command(about = "Find and control child screen-time devices on the local network", long_about = None)]
struct Cli {
    /// UDP port children listen on
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Broadcast address for discovery probes
    #[arg(long, global = true)]
    broadcast: Option<Ipv4Addr>,

    /// Discovery window in seconds
    #[arg(long, global = true)]
    window_secs: Option<u64>,

    /// Command reply timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Directory for the saved device selection
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Explicit target; falls back to the saved selection when omitted
#[derive(Args, Clone, Default)]
pub struct TargetArgs {
    /// Device IP address
    #[arg(long, requires = "device_id")]
    address: Option<IpAddr>,

    /// Device ID shown in the child app
    #[arg(long)]
    device_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the local network for child devices
    Scan {
        /// Remember the n-th device found (1-based)
        #[arg(long, requires = "device_id")]
        select: Option<usize>,

        /// Device ID to store with the selected device
        #[arg(long)]
        device_id: Option<String>,
    },
    /// Remember a device without scanning
    Select {
        #[arg(long)]
        address: IpAddr,

        #[arg(long)]
        device_id: String,

        /// Display name, defaults to "Child Device: <address>"
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the saved device and effective settings
    Status,
    /// Forget the saved device
    Forget,
    /// Ask the device how much screen time is left
    Time(TargetArgs),
    /// Lock the device
    Lock(TargetArgs),
    /// Give the device more screen time
    Extend {
        /// Minutes to add (1-1440)
        minutes: String,

        #[command(flatten)]
        target: TargetArgs,
    },
    /// Send a free-form command
    Send {
        command: String,

        #[command(flatten)]
        target: TargetArgs,
    },
    /// Act as a child device answering on the command port
    Simulate {
        /// Device ID the simulated child derives its key from
        #[arg(long)]
        device_id: String,

        /// Daily allowance in minutes
        #[arg(long, default_value_t = 60)]
        total_minutes: i64,
    },
    /// Show local network info
    Info,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(addr) = self.broadcast {
            config.broadcast_addr = addr;
        }
        if let Some(secs) = self.window_secs {
            config.discovery_window = Duration::from_secs(secs);
        }
        if let Some(secs) = self.timeout_secs {
            config.command_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("cst_parent=info".parse()?)
                .add_directive("cst_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command {
        Commands::Scan { select, device_id } => commands::run_scan(config, select, device_id).await?,
        Commands::Select { address, device_id, name } => {
            commands::select_device(config, address, &device_id, name)?
        }
        Commands::Status => commands::show_status(config)?,
        Commands::Forget => commands::forget_device(config)?,
        Commands::Time(target) => {
            commands::run_command(config, cst_core::Command::GetTimeLeft, target).await?
        }
        Commands::Lock(target) => {
            commands::run_command(config, cst_core::Command::LockDevice, target).await?
        }
        Commands::Extend { minutes, target } => {
            let command = cst_core::Command::parse_minutes(&minutes)?;
            commands::run_command(config, command, target).await?
        }
        Commands::Send { command, target } => {
            let command = cst_core::Command::custom(&command)?;
            commands::run_command(config, command, target).await?
        }
        Commands::Simulate { device_id, total_minutes } => {
            commands::run_simulator(config, &device_id, total_minutes).await?
        }
        Commands::Info => commands::show_info(config),
    }

    Ok(())
}
