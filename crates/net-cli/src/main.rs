//! Fabric isolation CLI (fabricctl)

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fabric_net_core::{ActionId, Channel, NicRef};
use fabricctl::commands::{
    bootstrap, ActionCommand, NetworkCommand, PortCommand, StatusCommand, SwitchCommand,
    VlansCommand,
};

#[derive(Parser)]
#[command(name = "fabricctl")]
#[command(about = "Bare-metal VLAN isolation CLI")]
#[command(version)]
#[command(long_about = "
Bare-metal VLAN isolation CLI

Connects and detaches node nics to and from networks by reconfiguring the
switch ports they are cabled to. Requests are validated, queued and applied
one at a time; the inventory file is updated once an action completes.

Examples:
  fabricctl vlans 12,14-18,23                      # Normalise a VLAN range
  fabricctl switch validate                        # Check switch configs and port names
  fabricctl network channels net-0                 # Channels usable on net-0
  fabricctl port show sw0 1/3                      # Live VLAN state of a port
  fabricctl connect node-1 eth0 net-0              # Attach natively
  fabricctl connect node-1 eth0 net-1 -C vlan/1512 # Attach tagged
  fabricctl detach node-1 eth0 net-1               # Detach
  fabricctl revert sw0 1/3                         # Strip every VLAN, power off
  fabricctl status <action-id>                     # Look up an earlier action
")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Engine configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Inventory file
    #[arg(short, long, global = true, default_value = "inventory.toml")]
    inventory: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and normalise a VLAN range
    Vlans {
        /// Range such as 12,14-18,23
        spec: String,
    },

    /// Switch commands
    Switch {
        #[command(subcommand)]
        command: SwitchCommands,
    },

    /// Network commands
    Network {
        #[command(subcommand)]
        command: NetworkCommands,
    },

    /// Port commands
    Port {
        #[command(subcommand)]
        command: PortCommands,
    },

    /// Attach a nic to a network
    Connect {
        node: String,
        nic: String,
        network: String,

        /// vlan/native or vlan/<id>
        #[arg(short = 'C', long, default_value = "vlan/native")]
        channel: Channel,
    },

    /// Detach a nic from a network
    Detach {
        node: String,
        nic: String,
        network: String,

        /// Defaults to the channel of the existing attachment
        #[arg(short = 'C', long)]
        channel: Option<Channel>,
    },

    /// Remove every VLAN from a port and power it off
    Revert { switch: String, port: String },

    /// Show the status of an earlier action
    Status {
        id: ActionId,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SwitchCommands {
    /// Validate every switch configuration and port name in the inventory
    Validate,
}

#[derive(Subcommand)]
enum NetworkCommands {
    /// List the channels a nic may use on a network
    Channels { network: String },
}

#[derive(Subcommand)]
enum PortCommands {
    /// Read the VLAN state of a port from its switch
    Show {
        switch: String,
        port: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    let inventory = cli.inventory.as_path();

    match cli.command {
        Commands::Vlans { spec } => VlansCommand::execute(&spec),

        Commands::Switch {
            command: SwitchCommands::Validate,
        } => SwitchCommand::new().validate(inventory),

        Commands::Network {
            command: NetworkCommands::Channels { network },
        } => {
            let context = bootstrap(config, inventory).await?;
            NetworkCommand::new(context).execute_channels(&network).await
        }

        Commands::Port {
            command: PortCommands::Show { switch, port, json },
        } => {
            let context = bootstrap(config, inventory).await?;
            PortCommand::new(context).show(&switch, &port, json).await
        }

        Commands::Connect {
            node,
            nic,
            network,
            channel,
        } => {
            let context = bootstrap(config, inventory).await?;
            ActionCommand::new(context, inventory)
                .connect(&NicRef::new(node, nic), &network, channel)
                .await
                .map(|_| ())
        }

        Commands::Detach {
            node,
            nic,
            network,
            channel,
        } => {
            let context = bootstrap(config, inventory).await?;
            ActionCommand::new(context, inventory)
                .detach(&NicRef::new(node, nic), &network, channel)
                .await
                .map(|_| ())
        }

        Commands::Revert { switch, port } => {
            let context = bootstrap(config, inventory).await?;
            ActionCommand::new(context, inventory)
                .revert(&switch, &port)
                .await
                .map(|_| ())
        }

        Commands::Status { id, json } => {
            let context = bootstrap(config, inventory).await?;
            StatusCommand::new(context).execute(id, json).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let quiet = cli.quiet;
    let show_chain = cli.verbose || cli.debug;

    match run(cli).await {
        Ok(()) => {
            log::info!("command completed successfully");
            std::process::exit(0);
        }
        Err(e) => {
            if !quiet {
                eprintln!("Error: {}", e);
                if show_chain {
                    for cause in e.chain().skip(1) {
                        eprintln!("  Caused by: {}", cause);
                    }
                }
            }
            std::process::exit(1);
        }
    }
}
