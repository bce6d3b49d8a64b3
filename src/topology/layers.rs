//! Periodic attention/SSD interleave.
//!
//! With period 8 and offset 7 a 16-layer stack reads
//! `ssd ×7, attn, ssd ×7, attn`: one attention layer closes every block.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{ConfigError, Result};

/// The sequence mixer a decoder layer is built around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Full causal self-attention.
    Attn,
    /// Structured state-space-duality mixer.
    Ssd,
}

impl LayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Attn => "attn",
            LayerType::Ssd => "ssd",
        }
    }

    pub fn is_attention(&self) -> bool {
        matches!(self, LayerType::Attn)
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layer type at `layer` for a given period and offset.
///
/// Pure rule, no bounds: `attn` iff `layer % period == offset`.
pub fn layer_type(layer: usize, period: usize, offset: usize) -> LayerType {
    if layer % period == offset {
        LayerType::Attn
    } else {
        LayerType::Ssd
    }
}

/// One entry of the build plan handed to the model constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LayerSlot {
    /// Position in the decoder stack.
    pub index: usize,

    /// Mixer used at this position.
    pub layer_type: LayerType,

    /// Ordinal among layers of the same type (e.g. which KV cache bank an
    /// attention layer owns).
    pub kind_index: usize,
}

/// Validated attention/SSD interleave for a decoder stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerTopology {
    num_layers: usize,
    period: usize,
    offset: usize,
}

impl LayerTopology {
    /// Build a topology, rejecting an empty stack, a zero period, or an
    /// offset outside `[0, period)`.
    pub fn new(num_layers: usize, period: usize, offset: usize) -> Result<Self> {
        if num_layers == 0 {
            return Err(ConfigError::InvalidTopology(
                "num_hidden_layers must be at least 1".to_string(),
            ));
        }
        if period == 0 {
            return Err(ConfigError::InvalidTopology(
                "attn_layer_period must be at least 1".to_string(),
            ));
        }
        if offset >= period {
            return Err(ConfigError::InvalidTopology(format!(
                "attn_layer_offset ({offset}) must be less than attn_layer_period ({period})"
            )));
        }

        let topology = Self {
            num_layers,
            period,
            offset,
        };
        if topology.num_attention_layers() == 0 {
            tracing::warn!(
                num_layers,
                period,
                offset,
                "attention offset lies beyond the stack; every layer is ssd"
            );
        }
        Ok(topology)
    }

    /// The stock 16-layer, period-8, offset-7 interleave.
    pub(crate) const fn from_defaults() -> Self {
        Self {
            num_layers: defaults::NUM_HIDDEN_LAYERS,
            period: defaults::ATTN_LAYER_PERIOD,
            offset: defaults::ATTN_LAYER_OFFSET,
        }
    }

    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Layer type at `layer`, or `None` past the end of the stack.
    pub fn layer_type_at(&self, layer: usize) -> Option<LayerType> {
        (layer < self.num_layers).then(|| layer_type(layer, self.period, self.offset))
    }

    /// Layer types for the whole stack, in order.
    pub fn layers_type(&self) -> Vec<LayerType> {
        (0..self.num_layers)
            .map(|layer| layer_type(layer, self.period, self.offset))
            .collect()
    }

    /// Indices of the attention layers, ascending.
    pub fn attention_layer_indices(&self) -> Vec<usize> {
        (self.offset..self.num_layers).step_by(self.period).collect()
    }

    pub fn num_attention_layers(&self) -> usize {
        self.attention_layers_before(self.num_layers)
    }

    pub fn num_ssd_layers(&self) -> usize {
        self.num_layers - self.num_attention_layers()
    }

    /// Ordinal of `layer` among the layers of its own type, or `None` past
    /// the end of the stack.
    pub fn kind_index(&self, layer: usize) -> Option<usize> {
        let attn_before = self.attention_layers_before(layer);
        self.layer_type_at(layer).map(|kind| match kind {
            LayerType::Attn => attn_before,
            LayerType::Ssd => layer - attn_before,
        })
    }

    /// Per-layer build plan.
    pub fn plan(&self) -> Vec<LayerSlot> {
        let mut attn_seen = 0;
        let mut ssd_seen = 0;
        self.layers_type()
            .into_iter()
            .enumerate()
            .map(|(index, layer_type)| {
                let counter = match layer_type {
                    LayerType::Attn => &mut attn_seen,
                    LayerType::Ssd => &mut ssd_seen,
                };
                let kind_index = *counter;
                *counter += 1;
                LayerSlot {
                    index,
                    layer_type,
                    kind_index,
                }
            })
            .collect()
    }

    /// Number of attention layers with index `< layer`.
    fn attention_layers_before(&self, layer: usize) -> usize {
        if layer <= self.offset {
            0
        } else {
            (layer - self.offset - 1) / self.period + 1
        }
    }
}
