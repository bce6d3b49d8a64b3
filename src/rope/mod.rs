//! Rotary position embeddings: scaling variants and frequency tables.
//!
//! `rope_scaling` arrives as a loose JSON record keyed by `rope_type`
//! (or the legacy `type`). [`scaling`] turns it into a closed
//! [`RopeScaling`] union, [`frequencies`] derives the inverse-frequency
//! table each variant implies.

pub mod frequencies;
pub mod scaling;

pub use frequencies::{RopeFrequencies, RopeGeometry};
pub use scaling::{normalize_rope_record, validate_rope_scaling, RopeRecord, RopeScaling, RopeType};
