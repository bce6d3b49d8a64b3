//! The flat hyperparameter record, exactly as it appears in `config.json`.
//!
//! Every field is a plain, independently settable value. Nothing here is
//! validated; [`DogeConfig::new`](super::DogeConfig::new) does that in one
//! pass.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::defaults;
use crate::rope::RopeRecord;

/// Raw Doge hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DogeParams {
    /// Vocabulary size.
    pub vocab_size: usize,

    /// Hidden dimension.
    pub hidden_size: usize,

    /// CDMoE / MLP intermediate dimension.
    pub intermediate_size: usize,

    /// Decoder depth. Signed; negative values are rejected as an invalid
    /// topology.
    pub num_hidden_layers: i64,

    /// Bias on hidden projections.
    pub hidden_bias: bool,

    /// Dropout on sequence and state transformations.
    pub hidden_dropout: f64,

    /// Decoder activation name.
    pub hidden_act: String,

    /// Longest sequence the model is configured for.
    pub max_position_embeddings: usize,

    /// RoPE base period.
    pub rope_theta: f64,

    /// RoPE scaling record; `None` means plain RoPE.
    pub rope_scaling: Option<RopeRecord>,

    pub initializer_range: f64,

    pub rms_norm_eps: f64,

    pub use_cache: bool,

    pub pad_token_id: Option<u32>,

    pub bos_token_id: Option<u32>,

    pub eos_token_id: Option<u32>,

    pub tie_word_embeddings: bool,

    /// Chunk length of the SSD scan.
    pub ssd_chunk_size: usize,

    /// Attention heads per attention layer.
    pub num_attention_heads: usize,

    pub attention_dropout: f64,

    /// One attention layer every this many layers.
    pub attn_layer_period: i64,

    /// Index of the first attention layer within each period.
    pub attn_layer_offset: i64,

    /// Replace the MLP with the cross-domain mixture of experts.
    pub is_moe: bool,

    pub num_cdmmoe_experts: usize,

    pub num_cdmmoe_heads: usize,

    pub num_cdmmoe_experts_per_head: usize,

    pub expert_retrieval_size: usize,

    /// Model family tag; checked on input, always `"doge"` on output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,

    /// Keys this crate does not know about, carried through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for DogeParams {
    fn default() -> Self {
        Self {
            vocab_size: defaults::VOCAB_SIZE,
            hidden_size: defaults::HIDDEN_SIZE,
            intermediate_size: defaults::INTERMEDIATE_SIZE,
            num_hidden_layers: defaults::NUM_HIDDEN_LAYERS as i64,
            hidden_bias: false,
            hidden_dropout: 0.0,
            hidden_act: defaults::HIDDEN_ACT.to_string(),
            max_position_embeddings: defaults::MAX_POSITION_EMBEDDINGS,
            rope_theta: defaults::ROPE_THETA,
            rope_scaling: None,
            initializer_range: defaults::INITIALIZER_RANGE,
            rms_norm_eps: defaults::RMS_NORM_EPS,
            use_cache: true,
            pad_token_id: Some(defaults::PAD_TOKEN_ID),
            bos_token_id: Some(defaults::BOS_TOKEN_ID),
            eos_token_id: Some(defaults::EOS_TOKEN_ID),
            tie_word_embeddings: false,
            ssd_chunk_size: defaults::SSD_CHUNK_SIZE,
            num_attention_heads: defaults::NUM_ATTENTION_HEADS,
            attention_dropout: 0.0,
            attn_layer_period: defaults::ATTN_LAYER_PERIOD as i64,
            attn_layer_offset: defaults::ATTN_LAYER_OFFSET as i64,
            is_moe: false,
            num_cdmmoe_experts: defaults::NUM_CDMMOE_EXPERTS,
            num_cdmmoe_heads: defaults::NUM_CDMMOE_HEADS,
            num_cdmmoe_experts_per_head: defaults::NUM_CDMMOE_EXPERTS_PER_HEAD,
            expert_retrieval_size: defaults::EXPERT_RETRIEVAL_SIZE,
            model_type: None,
            extra: Map::new(),
        }
    }
}
