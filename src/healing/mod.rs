pub mod decision;
pub mod engine;
pub mod error;
pub mod healing_model;
pub mod locks;
pub mod scorer;
pub mod synthesizer;
