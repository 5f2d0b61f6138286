use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use indecab_export::jobs::{self, RunOptions};
use indecab_export::{ApiClient, Config, JobKind};

#[derive(Parser, Debug)]
#[command(name = "indecab-export")]
#[command(version = "0.1.0")]
#[command(about = "Export fleet operations data from the Indecab API into Excel workbooks")]
struct Args {
    /// Export job to run
    #[arg(value_enum)]
    job: JobKind,

    /// Start date override (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End date override (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Output file (defaults to EXPORT_DIR/<job>.xlsx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Records per page override
    #[arg(long)]
    page_size: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("indecab_export=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env()?;
    let client = ApiClient::new(&config)?;

    let options = RunOptions {
        from: args.from,
        to: args.to,
        output: args.output,
        page_size: args.page_size,
    };

    let path = jobs::run(&client, args.job, &config, &options).await?;
    println!("Export written to: {}", path.display());

    Ok(())
}
