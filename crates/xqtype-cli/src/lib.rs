pub mod commands;
pub mod util;

use clap::{Parser, ValueEnum};
use commands::query::QueryArgs;
use tracing_subscriber::EnvFilter;
use util::CliResult;

#[derive(Parser, Debug)]
#[command(name = "xqtype", version, about = "Evaluate `instance of` and `treat as` queries")]
pub struct Cli {
    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// How much of an operand is evaluated before the verdict.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Stop pulling items once the verdict is known.
    Lazy,
    /// Evaluate the whole operand first.
    Eager,
}

impl From<PolicyArg> for xqtype::ConsumptionPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Lazy => xqtype::ConsumptionPolicy::Lazy,
            PolicyArg::Eager => xqtype::ConsumptionPolicy::Eager,
        }
    }
}

pub fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing();
    let output = commands::query::run(&cli.query)?;
    println!("{output}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // a subscriber may already be installed by an embedding host
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
