pub mod parser;
pub mod snapshot_model;
