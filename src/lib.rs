//! # Doge
//!
//! Configuration resolver for the Doge causal language model: a hybrid
//! decoder that interleaves full-attention layers with state-space-duality
//! (SSD) layers, with an optional cross-domain mixture-of-experts (CDMoE)
//! feed-forward block.
//!
//! ## What this crate decides
//!
//! 1. **Topology** — which layers are attention and which are SSD
//!    (`attn` iff `layer % attn_layer_period == attn_layer_offset`)
//! 2. **RoPE scaling** — validation of the `rope_scaling` record over the
//!    closed set `default | linear | dynamic | yarn | longrope | llama3`
//! 3. **Rotary frequencies** — the inverse-frequency table each variant implies
//! 4. **CDMoE retrieval** — product-key expert retrieval shape
//! 5. **`config.json`** — hub-compatible document I/O with pass-through keys
//!
//! ## Stock architecture
//!
//! - 16 layers: 14 SSD + 2 attention (period-8 interleave, offset 7)
//! - hidden 1024, 8 heads, head_dim 128
//! - CDMoE: 4096 experts (64 × 64 product keys), 4 heads × 8 experts

pub mod config;
pub mod error;
pub mod moe;
pub mod rope;
pub mod topology;

pub use config::{DogeConfig, DogeParams};
pub use error::{ConfigError, Result};
pub use moe::CdmoeConfig;
pub use rope::{RopeFrequencies, RopeScaling, RopeType};
pub use topology::{LayerSlot, LayerTopology, LayerType};

/// Default hyperparameters.
pub mod defaults {
    /// Vocabulary size.
    pub const VOCAB_SIZE: usize = 32768;

    /// Model hidden dimension.
    pub const HIDDEN_SIZE: usize = 1024;

    /// CDMoE / MLP intermediate dimension.
    pub const INTERMEDIATE_SIZE: usize = 4096;

    /// Total decoder layers.
    pub const NUM_HIDDEN_LAYERS: usize = 16;

    /// Decoder activation.
    pub const HIDDEN_ACT: &str = "silu";

    /// Maximum context length.
    pub const MAX_POSITION_EMBEDDINGS: usize = 2048;

    /// RoPE base period.
    pub const ROPE_THETA: f64 = 10000.0;

    pub const INITIALIZER_RANGE: f64 = 0.02;

    pub const RMS_NORM_EPS: f64 = 1e-6;

    pub const PAD_TOKEN_ID: u32 = 0;
    pub const BOS_TOKEN_ID: u32 = 1;
    pub const EOS_TOKEN_ID: u32 = 2;

    /// SSD scan chunk length.
    pub const SSD_CHUNK_SIZE: usize = 256;

    /// Attention heads.
    pub const NUM_ATTENTION_HEADS: usize = 8;

    /// Head dimension (hidden / heads).
    pub const HEAD_DIM: usize = HIDDEN_SIZE / NUM_ATTENTION_HEADS; // 128

    /// One attention layer every this many layers.
    pub const ATTN_LAYER_PERIOD: usize = 8;

    /// Phase of the attention layer within each period.
    pub const ATTN_LAYER_OFFSET: usize = 7;

    /// CDMoE private experts (64²).
    pub const NUM_CDMMOE_EXPERTS: usize = 4096;

    /// CDMoE retrieval heads.
    pub const NUM_CDMMOE_HEADS: usize = 4;

    /// Experts selected per retrieval head.
    pub const NUM_CDMMOE_EXPERTS_PER_HEAD: usize = 8;

    /// CDMoE retrieval query width.
    pub const EXPERT_RETRIEVAL_SIZE: usize = 256;
}
