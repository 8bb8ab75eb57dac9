pub mod proto;

pub use proto::ModelProto;
