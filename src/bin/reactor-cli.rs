//! Reactor CLI - inspect service descriptors
//!
//! Lists methods, prints the derived form fields of a descriptor, and shows
//! which endpoint a network selection resolves to.

use anyhow::Context;
use clap::{Parser, Subcommand};
use reactor::interface::fields::derive_method_field;
use reactor::{Network, ServiceDescriptor, StoreOptions, derive_fields};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "reactor")]
#[command(about = "Inspect remote actor descriptors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the methods of a descriptor
    Methods {
        /// Descriptor file (JSON)
        descriptor: PathBuf,
    },

    /// Print derived form fields as JSON
    Fields {
        /// Descriptor file (JSON)
        descriptor: PathBuf,

        /// Only derive this method
        #[arg(short, long)]
        method: Option<String>,
    },

    /// Show the endpoint a store would connect to
    Endpoint {
        /// Target the production network
        #[arg(long)]
        mainnet: bool,

        /// Store options file (JSON) with an optional host override
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Methods { descriptor } => {
            let descriptor = load_descriptor(&descriptor)?;
            println!("Canister: {}", descriptor.canister_id);
            for method in &descriptor.methods {
                let args: Vec<String> = method
                    .argument_types
                    .iter()
                    .map(|arg| match &arg.name {
                        Some(name) => format!("{name}: {}", arg.ty.type_name()),
                        None => arg.ty.type_name(),
                    })
                    .collect();
                println!(
                    "  {:<8} {}({}) -> {}",
                    method.kind.to_string(),
                    method.name,
                    args.join(", "),
                    method.return_type.type_name()
                );
            }
        }

        Commands::Fields { descriptor, method } => {
            let descriptor = load_descriptor(&descriptor)?;
            let fields = match method {
                Some(name) => {
                    let method = descriptor
                        .method(&name)
                        .with_context(|| format!("unknown method `{name}`"))?;
                    vec![derive_method_field(&descriptor, method)?]
                }
                None => derive_fields(&descriptor)?,
            };
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }

        Commands::Endpoint { mainnet, config } => {
            let options = match config {
                Some(path) => StoreOptions::load(&path)?,
                None => StoreOptions::default(),
            };
            let network = Network::from_mainnet_flag(mainnet);
            println!("{network}: {}", options.endpoint(network));
        }
    }

    Ok(())
}

fn load_descriptor(path: &Path) -> anyhow::Result<ServiceDescriptor> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read descriptor {}", path.display()))?;
    ServiceDescriptor::from_json(&text)
        .with_context(|| format!("invalid descriptor {}", path.display()))
}
