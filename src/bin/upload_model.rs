//! Uploads `current_model.onnx` and `model_metrics.json` to `ml_models`.
//!
//! Previously active models are left active: the runtime decides which of
//! several active entries to load.

use clap::Parser;
use signal_model_pipeline::application::ml::uploader::upload_model;
use signal_model_pipeline::config::Config;
use signal_model_pipeline::domain::ml::model_registry::ActivationPolicy;
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
    let artifacts = ArtifactStore::new(config.artifacts);
    let client = SupabaseClient::new(config.store)?;
    upload_model(&artifacts, &client, &client, ActivationPolicy::KeepExisting).await?;
    Ok(())
}
