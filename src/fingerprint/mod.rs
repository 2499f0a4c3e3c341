pub mod extractor;
pub mod fingerprint_model;
pub mod normalize;
pub mod page_key;
