//! Trains the signal outcome classifier and exports it to ONNX.
//!
//! Writes `current_model.onnx` and `model_metrics.json` to the working
//! directory for `upload_model` to pick up.

use clap::Parser;
use signal_model_pipeline::application::ml::trainer::run_training;
use signal_model_pipeline::config::Config;
use signal_model_pipeline::infrastructure::observability::init_logging;
use signal_model_pipeline::infrastructure::persistence::ArtifactStore;
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
    let artifacts = ArtifactStore::new(config.artifacts);
    run_training(&client, &artifacts).await?;
    Ok(())
}
