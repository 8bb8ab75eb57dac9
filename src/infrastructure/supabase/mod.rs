pub mod client;
pub mod users;

pub use client::{MODELS_TABLE, SupabaseClient, TRAINING_TABLE};
