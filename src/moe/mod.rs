//! Cross-domain mixture of experts (CDMoE).
//!
//! Experts are retrieved with product keys: each retrieval head splits its
//! query in two halves, scores each half against `num_keys` sub-keys, and the
//! Cartesian product of the top sub-keys indexes the `num_keys²` experts.

pub mod cdmoe;

pub use cdmoe::CdmoeConfig;
