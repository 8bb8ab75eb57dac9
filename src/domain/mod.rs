pub mod errors;
pub mod ml;
pub mod ports;
