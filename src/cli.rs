// Subcommand shell. This module only defines the argument grammar;
// `main.rs` holds the dispatch logic. Argument parsing itself is named as
// an external collaborator in spec §1, but the surface it describes
// (convert / package / client subcommands against a daemon connection)
// still needs somewhere to live, so this mirrors the original
// `shimejictl.py` subparser layout one-for-one where a subcommand maps
// onto something this crate implements end to end.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "shimeji-ctl", about = "Mascot overlay control-plane toolchain", version)]
pub struct Cli {
    /// Path to a `ron`-format client config file (socket path, start, verbosity).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the overlay daemon's SOCK_SEQPACKET socket. Overrides --config.
    #[arg(long, global = true)]
    pub socket: Option<String>,

    /// Start the overlay daemon if it isn't already listening.
    #[arg(long, global = true)]
    pub start: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert actions.xml + behaviors.xml into programs/actions/behaviors JSON.
    Convert(ConvertArgs),
    /// Compile a mascot directory into a .wlshm package.
    Package(PackageArgs),
    /// Talk to a running overlay daemon.
    #[command(subcommand)]
    Client(ClientCommand),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    #[arg(long)]
    pub actions: PathBuf,
    #[arg(long)]
    pub behaviors: PathBuf,
    #[arg(long, default_value = "out")]
    pub out_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct PackageArgs {
    /// Mascot source directory containing actions.xml, behaviors.xml and assets/.
    pub dir: PathBuf,
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "1.0")]
    pub version: String,
    #[arg(long)]
    pub display_name: Option<String>,
    #[arg(long, default_value = "out.wlshm")]
    pub out: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum ClientCommand {
    /// Connect, complete the handshake, and exit.
    Status,
    /// List known prototypes (populated after the first CommitPrototypes).
    ListPrototypes,
    /// List known environments.
    ListEnvironments,
    /// Ask the daemon to spawn a mascot instance.
    Spawn(SpawnArgs),
    /// Dispose of a mascot by object id.
    Dispose { id: u32 },
    /// Start an environment-picking selection.
    Select { environments: Vec<u32> },
    /// Import a .wlshm package into the daemon.
    Import {
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
    /// Export a prototype to a .wlshm package.
    Export { prototype: u32, out: PathBuf },
    /// Apply a named behavior to a mascot.
    ApplyBehavior { id: u32, behavior: String },
    /// Read a daemon configuration key.
    GetConfig { key: String },
    /// Write a daemon configuration key.
    SetConfig { key: String, value: String },
    /// List all daemon configuration keys.
    ListConfig,
    /// Ask the daemon to reload a prototype from disk.
    ReloadPrototype { path: String },
    /// Stop the overlay daemon.
    Stop,
}

#[derive(Debug, Args)]
pub struct SpawnArgs {
    pub prototype: u32,
    pub environment: u32,
    #[arg(long, default_value_t = 0)]
    pub x: u32,
    #[arg(long, default_value_t = 0)]
    pub y: u32,
    #[arg(long, default_value = "Fall")]
    pub behavior: String,
}
