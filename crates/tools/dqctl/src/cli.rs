use clap::{Args, Parser, Subcommand, ValueEnum};
use dq_config::{Environment, EnvironmentKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dqctl")]
#[command(about = "Manage sources, continuous queries and reactions")]
pub struct Cli {
    /// Configuration file, defaults to $DQ_CONFIG or the user config directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Registered environment to use instead of the current one
    #[arg(short, long, global = true)]
    pub environment: Option<String>,

    /// Management API URL, bypasses the environment registry
    #[arg(long, global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or update resources from manifest files
    Apply {
        #[command(flatten)]
        files: ManifestArgs,
    },

    /// Delete the resources described by manifest files
    Delete {
        #[command(flatten)]
        files: ManifestArgs,
    },

    /// Wait for resources to come online
    Wait {
        #[command(flatten)]
        files: ManifestArgs,

        /// Seconds to wait for each resource
        #[arg(short, long, default_value_t = 60)]
        timeout: u64,
    },

    /// List resources of a kind
    List {
        /// Resource kind, e.g. source or continuousquery
        kind: String,
    },

    /// Show one resource
    Describe { kind: String, name: String },

    /// Show the live results of a continuous query
    Watch { name: String },

    /// Manage registered environments
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Manifest files, JSON or TOML
    #[arg(short, long = "file", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

#[derive(Subcommand)]
pub enum EnvCommands {
    /// List registered environments
    List,

    /// Make an environment current
    Use { name: String },

    /// Register or replace an environment
    Add {
        #[command(flatten)]
        environment: EnvArgs,
    },

    /// Forget an environment
    Remove { name: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Kubernetes,
    Docker,
}

#[derive(Args, Clone)]
pub struct EnvArgs {
    /// Environment name
    pub name: String,

    /// Management API URL
    #[arg(long)]
    pub url: String,

    #[arg(long, value_enum, default_value_t = KindArg::Kubernetes)]
    pub kind: KindArg,

    /// Namespace the platform is installed in
    #[arg(short, long)]
    pub namespace: Option<String>,
}

impl From<EnvArgs> for Environment {
    fn from(value: EnvArgs) -> Self {
        Self {
            name: value.name,
            kind: match value.kind {
                KindArg::Kubernetes => EnvironmentKind::Kubernetes,
                KindArg::Docker => EnvironmentKind::Docker,
            },
            api_url: value.url,
            namespace: value.namespace,
        }
    }
}
