use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cmr",
    about = "Component Metadata Resolver: token URIs for (wheel, engine, build, wrapping) records",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store connection string (overrides DB_URI)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Highest valid component id (overrides MAX_COMPONENT_SUPPLY)
    #[arg(long, global = true)]
    pub max_supply: Option<u32>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP resolver
    Serve(ServeArgs),
    /// Resolve a component tuple to its token URI
    Resolve(TupleArgs),
    /// Register a record for a component tuple
    Register(RegisterArgs),
    /// List every stored record
    List(ListArgs),
    /// Delete every stored record
    Clear(ClearArgs),
    /// Validate a component tuple without touching the store
    Check(TupleArgs),
}

#[derive(Args, Clone, Debug)]
pub struct TupleArgs {
    #[arg(allow_negative_numbers = true)]
    pub wheel: String,
    #[arg(allow_negative_numbers = true)]
    pub engine: String,
    #[arg(allow_negative_numbers = true)]
    pub build: String,
    #[arg(allow_negative_numbers = true)]
    pub wrapping: String,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[command(flatten)]
    pub tuple: TupleArgs,
    #[arg(long, default_value = "")]
    pub image: String,
    #[arg(long, default_value = "")]
    pub asset: String,
    #[arg(long, default_value = "")]
    pub metadata: String,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<String>,
    /// Expose /all-cars and /delete-all
    #[arg(long)]
    pub debug_endpoints: bool,
    /// Reject registering a tuple that already has a record
    #[arg(long)]
    pub unique: bool,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    pub drafts: bool,
    /// Only records for this tuple, duplicates included
    #[arg(
        long,
        num_args = 4,
        value_names = ["WHEEL", "ENGINE", "BUILD", "WRAPPING"],
        allow_negative_numbers = true
    )]
    pub tuple: Option<Vec<String>>,
}

#[derive(Args)]
pub struct ClearArgs {
    #[arg(long)]
    pub yes: bool,
}
