//! Context fingerprinting: feature extraction and the three derived keys
//! (exact hash, semantic hash, compound key).

pub mod extractor;
pub mod hasher;

pub use extractor::{FEATURE_DIM, extract_features, feature_weights};
pub use hasher::{ContextHashes, all_hashes, compound_key, exact_hash, hash_user_id, semantic_hash};
