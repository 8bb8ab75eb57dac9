//! Inserts synthetic rows into `ml_training_data` for development runs.
//!
//! Labels are `rsi > 0.5`, so training on this data should score close to
//! perfect accuracy.

use clap::Parser;
use signal_model_pipeline::application::ml::mock_data::seed_mock_data;
use signal_model_pipeline::config::Config;
use signal_model_pipeline::infrastructure::observability::init_logging;
use signal_model_pipeline::infrastructure::supabase::SupabaseClient;
use tracing::error;

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
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("{:#}", e);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let client = SupabaseClient::new(config.store)?;
    let mut rng = rand::rng();
    seed_mock_data(&client, &client, &mut rng).await?;
    Ok(())
}
