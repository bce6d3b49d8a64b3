//! Layer topology: which decoder layers are full attention and which are SSD.
//!
//! Attention layers recur with a fixed period and phase offset; every other
//! layer is a state-space-duality mixer.

pub mod layers;

pub use layers::{layer_type, LayerSlot, LayerTopology, LayerType};
