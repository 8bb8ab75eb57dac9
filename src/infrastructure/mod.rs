pub mod observability;
pub mod onnx;
pub mod persistence;
pub mod repositories;
pub mod supabase;
