pub mod feature_registry;
pub mod metrics;
pub mod model_registry;
pub mod training_record;
