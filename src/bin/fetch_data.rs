//! Fetches labeled signal outcomes, previews them and writes
//! `training_data_dump.csv` for inspection.
//!
//! # Environment Variables
//! - `SUPABASE_URL` - project URL
//! - `SUPABASE_KEY` - service role key

use clap::Parser;
use signal_model_pipeline::application::ml::data_fetcher::{fetch_training_data, log_preview};
use signal_model_pipeline::config::Config;
use signal_model_pipeline::infrastructure::observability::init_logging;
use signal_model_pipeline::infrastructure::persistence::ArtifactStore;
use signal_model_pipeline::infrastructure::supabase::SupabaseClient;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _args = Args::parse();
    dotenvy::dotenv().ok();
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            error!("Add SUPABASE_URL and your service role SUPABASE_KEY to .env");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("{:#}", e);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let client = SupabaseClient::new(config.store)?;
    let dataset = fetch_training_data(&client).await?;
    if dataset.is_empty() {
        return Ok(());
    }

    log_preview(&dataset);
    ArtifactStore::new(config.artifacts).save_dump(&dataset)?;
    info!("Done.");
    Ok(())
}
