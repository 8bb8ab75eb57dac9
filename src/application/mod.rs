// Model pipeline: fetch, synthesize, train, export, upload
pub mod ml;
