// Pipeline stages
pub mod data_fetcher;
pub mod mock_data;
pub mod trainer;
pub mod uploader;

// Learner and model interchange
pub mod dataset_split;
pub mod gradient_boosting;
pub mod onnx_export;
