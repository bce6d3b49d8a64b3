//! The validated, immutable Doge configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::moe::CdmoeConfig;
use crate::rope::{
    normalize_rope_record, validate_rope_scaling, RopeFrequencies, RopeGeometry, RopeRecord,
    RopeScaling,
};
use crate::topology::{LayerSlot, LayerTopology, LayerType};

use super::params::DogeParams;

/// A Doge configuration that has passed every check.
///
/// Built all-or-nothing from [`DogeParams`]; there is no way to observe a
/// partially valid value. To change a field, take the params back out with
/// [`DogeConfig::into_params`], edit, and rebuild.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DogeParams", into = "DogeParams")]
pub struct DogeConfig {
    params: DogeParams,
    topology: LayerTopology,
    rope: RopeScaling,
    cdmoe: Option<CdmoeConfig>,
}

impl DogeConfig {
    /// Hub `model_type` tag.
    pub const MODEL_TYPE: &'static str = "doge";

    /// Model outputs a generation loop should not feed back.
    pub const KEYS_TO_IGNORE_AT_INFERENCE: &'static [&'static str] = &["past_key_values"];

    /// Validate `params` and freeze them.
    pub fn new(mut params: DogeParams) -> Result<Self> {
        if let Some(model_type) = params.model_type.as_deref() {
            if model_type != Self::MODEL_TYPE {
                return Err(ConfigError::ModelTypeMismatch(model_type.to_string()));
            }
        }

        let topology = LayerTopology::new(
            topology_count("num_hidden_layers", params.num_hidden_layers)?,
            topology_count("attn_layer_period", params.attn_layer_period)?,
            topology_count("attn_layer_offset", params.attn_layer_offset)?,
        )?;

        check_dimensions(&params)?;
        let head_dim = params.hidden_size / params.num_attention_heads;

        let rope = validate_rope_scaling(params.rope_scaling.as_ref(), head_dim)?;
        if let RopeScaling::Llama3 {
            original_max_position_embeddings,
            ..
        } = rope
        {
            if original_max_position_embeddings >= params.max_position_embeddings {
                tracing::warn!(
                    original_max_position_embeddings,
                    max_position_embeddings = params.max_position_embeddings,
                    "llama3 original context is not shorter than max_position_embeddings"
                );
            }
        }

        let cdmoe = if params.is_moe {
            Some(CdmoeConfig::new(
                params.num_cdmmoe_experts,
                params.num_cdmmoe_heads,
                params.num_cdmmoe_experts_per_head,
                params.expert_retrieval_size,
            )?)
        } else {
            None
        };

        params.rope_scaling = params.rope_scaling.as_ref().map(normalize_rope_record);
        params.model_type = Some(Self::MODEL_TYPE.to_string());

        tracing::debug!(
            layers = topology.num_layers(),
            attention_layers = topology.num_attention_layers(),
            head_dim,
            rope_type = %rope.rope_type(),
            is_moe = params.is_moe,
            "resolved doge config"
        );

        Ok(Self {
            params,
            topology,
            rope,
            cdmoe,
        })
    }

    /// All hyperparameters, with `rope_scaling` normalized.
    pub fn params(&self) -> &DogeParams {
        &self.params
    }

    pub fn into_params(self) -> DogeParams {
        self.params
    }

    pub fn vocab_size(&self) -> usize {
        self.params.vocab_size
    }

    pub fn hidden_size(&self) -> usize {
        self.params.hidden_size
    }

    pub fn intermediate_size(&self) -> usize {
        self.params.intermediate_size
    }

    pub fn num_hidden_layers(&self) -> usize {
        self.topology.num_layers()
    }

    pub fn num_attention_heads(&self) -> usize {
        self.params.num_attention_heads
    }

    /// `hidden_size / num_attention_heads`.
    pub fn head_dim(&self) -> usize {
        self.params.hidden_size / self.params.num_attention_heads
    }

    pub fn max_position_embeddings(&self) -> usize {
        self.params.max_position_embeddings
    }

    pub fn rope_theta(&self) -> f64 {
        self.params.rope_theta
    }

    /// Validated RoPE variant ([`RopeScaling::Default`] when unset).
    pub fn rope_scaling(&self) -> &RopeScaling {
        &self.rope
    }

    /// Normalized `rope_scaling` record as it will be written out.
    pub fn rope_scaling_record(&self) -> Option<&RopeRecord> {
        self.params.rope_scaling.as_ref()
    }

    pub fn ssd_chunk_size(&self) -> usize {
        self.params.ssd_chunk_size
    }

    pub fn is_moe(&self) -> bool {
        self.params.is_moe
    }

    pub fn pad_token_id(&self) -> Option<u32> {
        self.params.pad_token_id
    }

    pub fn bos_token_id(&self) -> Option<u32> {
        self.params.bos_token_id
    }

    pub fn eos_token_id(&self) -> Option<u32> {
        self.params.eos_token_id
    }

    /// Attention/SSD interleave.
    pub fn topology(&self) -> LayerTopology {
        self.topology
    }

    pub fn layer_type_at(&self, layer: usize) -> Option<LayerType> {
        self.topology().layer_type_at(layer)
    }

    pub fn layers_type(&self) -> Vec<LayerType> {
        self.topology().layers_type()
    }

    pub fn layer_plan(&self) -> Vec<LayerSlot> {
        self.topology().plan()
    }

    /// CDMoE retrieval settings, or `None` for a dense MLP model.
    pub fn cdmoe(&self) -> Option<CdmoeConfig> {
        self.cdmoe
    }

    pub fn rope_geometry(&self) -> RopeGeometry {
        RopeGeometry {
            head_dim: self.head_dim(),
            theta: self.params.rope_theta,
            max_position_embeddings: self.params.max_position_embeddings,
        }
    }

    /// Rotary inverse frequencies at an optional runtime sequence length.
    pub fn rope_frequencies(&self, seq_len: Option<usize>) -> RopeFrequencies {
        RopeFrequencies::compute(&self.rope, self.rope_geometry(), seq_len)
    }
}

impl Default for DogeConfig {
    fn default() -> Self {
        Self {
            params: DogeParams {
                model_type: Some(Self::MODEL_TYPE.to_string()),
                ..DogeParams::default()
            },
            topology: LayerTopology::from_defaults(),
            rope: RopeScaling::Default,
            cdmoe: None,
        }
    }
}

impl TryFrom<DogeParams> for DogeConfig {
    type Error = ConfigError;

    fn try_from(params: DogeParams) -> Result<Self> {
        Self::new(params)
    }
}

impl From<DogeConfig> for DogeParams {
    fn from(config: DogeConfig) -> Self {
        config.params
    }
}

fn topology_count(field: &str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        ConfigError::InvalidTopology(format!("{field} must not be negative, got {value}"))
    })
}

fn check_dimensions(params: &DogeParams) -> Result<()> {
    for (field, value) in [
        ("vocab_size", params.vocab_size),
        ("hidden_size", params.hidden_size),
        ("intermediate_size", params.intermediate_size),
        ("num_attention_heads", params.num_attention_heads),
        ("max_position_embeddings", params.max_position_embeddings),
        ("ssd_chunk_size", params.ssd_chunk_size),
    ] {
        if value == 0 {
            return Err(ConfigError::dims(field, "must be at least 1"));
        }
    }

    if params.hidden_size % params.num_attention_heads != 0 {
        return Err(ConfigError::dims(
            "hidden_size",
            format!(
                "{} is not divisible by num_attention_heads ({})",
                params.hidden_size, params.num_attention_heads
            ),
        ));
    }
    let head_dim = params.hidden_size / params.num_attention_heads;
    if head_dim % 2 != 0 {
        return Err(ConfigError::dims(
            "num_attention_heads",
            format!("head_dim {head_dim} must be even for rotary embeddings"),
        ));
    }

    if !(params.rope_theta.is_finite() && params.rope_theta > 0.0) {
        return Err(ConfigError::dims(
            "rope_theta",
            format!("must be a positive finite number, got {}", params.rope_theta),
        ));
    }

    for (field, value) in [
        ("hidden_dropout", params.hidden_dropout),
        ("attention_dropout", params.attention_dropout),
    ] {
        if !(0.0..1.0).contains(&value) {
            return Err(ConfigError::dims(
                field,
                format!("must be in [0, 1), got {value}"),
            ));
        }
    }

    for (field, value) in [
        ("rms_norm_eps", params.rms_norm_eps),
        ("initializer_range", params.initializer_range),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::dims(
                field,
                format!("must be a positive finite number, got {value}"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rope_record(value: serde_json::Value) -> Option<RopeRecord> {
        match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let built = DogeConfig::new(DogeParams::default()).unwrap();
        assert_eq!(built, DogeConfig::default());
        assert_eq!(built.head_dim(), crate::defaults::HEAD_DIM);
        assert_eq!(built.rope_scaling(), &RopeScaling::Default);
        assert!(built.cdmoe().is_none());
        assert_eq!(DogeConfig::KEYS_TO_IGNORE_AT_INFERENCE, &["past_key_values"]);
    }

    #[test]
    fn test_default_layers_type() {
        let config = DogeConfig::default();
        let mut expected = vec![LayerType::Ssd; 7];
        expected.push(LayerType::Attn);
        expected.extend(vec![LayerType::Ssd; 7]);
        expected.push(LayerType::Attn);
        assert_eq!(config.layers_type(), expected);
        assert_eq!(config.layers_type(), config.layers_type());
        assert_eq!(config.layer_type_at(7), Some(LayerType::Attn));
        assert_eq!(config.layer_type_at(16), None);
    }

    #[test]
    fn test_invalid_topology_fails_construction() {
        let params = DogeParams {
            attn_layer_period: 4,
            attn_layer_offset: 4,
            ..DogeParams::default()
        };
        assert!(matches!(
            DogeConfig::new(params),
            Err(ConfigError::InvalidTopology(_))
        ));

        let params = DogeParams {
            num_hidden_layers: 0,
            ..DogeParams::default()
        };
        assert!(matches!(
            DogeConfig::new(params),
            Err(ConfigError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_negative_topology_values_are_topology_errors() {
        for doc in [
            r#"{"num_hidden_layers": -1}"#,
            r#"{"attn_layer_period": -8}"#,
            r#"{"attn_layer_offset": -1}"#,
        ] {
            match DogeConfig::from_json_str(doc) {
                Err(ConfigError::InvalidTopology(reason)) => {
                    assert!(reason.contains("must not be negative"), "{doc}: {reason}")
                }
                other => panic!("{doc}: expected InvalidTopology, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_rope_does_not_affect_topology() {
        let plain = DogeConfig::default();
        let scaled = DogeConfig::new(DogeParams {
            rope_scaling: rope_record(json!({"rope_type": "linear", "factor": 4.0})),
            rope_theta: 500_000.0,
            ..DogeParams::default()
        })
        .unwrap();
        assert_eq!(plain.layers_type(), scaled.layers_type());
        assert_eq!(scaled.rope_scaling(), &RopeScaling::Linear { factor: 4.0 });
    }

    #[test]
    fn test_legacy_rope_key_is_normalized_in_stored_record() {
        let legacy = rope_record(json!({"type": "yarn", "factor": 2.0}));
        let config = DogeConfig::new(DogeParams {
            rope_scaling: legacy.clone(),
            ..DogeParams::default()
        })
        .unwrap();
        let stored = config.rope_scaling_record().unwrap();
        assert_eq!(stored["rope_type"], json!("yarn"));
        assert_eq!(stored["type"], json!("yarn"));

        let modern = DogeConfig::new(DogeParams {
            rope_scaling: rope_record(json!({"rope_type": "yarn", "factor": 2.0})),
            ..DogeParams::default()
        })
        .unwrap();
        assert_eq!(config.rope_scaling(), modern.rope_scaling());
        // The caller's record was copied, not rewritten.
        assert!(!legacy.unwrap().contains_key("rope_type"));
    }

    #[test]
    fn test_longrope_uses_derived_head_dim() {
        // hidden 1024 / 8 heads = head_dim 128 -> 64 factors
        let ok = DogeParams {
            rope_scaling: rope_record(json!({
                "rope_type": "longrope",
                "short_factor": vec![1.0; 64],
                "long_factor": vec![2.0; 64],
                "original_max_position_embeddings": 1024,
            })),
            ..DogeParams::default()
        };
        assert!(DogeConfig::new(ok).is_ok());

        let bad = DogeParams {
            rope_scaling: rope_record(json!({
                "rope_type": "longrope",
                "short_factor": vec![1.0; 64],
                "long_factor": vec![2.0; 65],
            })),
            ..DogeParams::default()
        };
        match DogeConfig::new(bad) {
            Err(ConfigError::InvalidRopeScaling { field, .. }) => assert_eq!(field, "long_factor"),
            other => panic!("expected long_factor error, got {other:?}"),
        }
    }

    #[test]
    fn test_llama3_long_original_context_is_accepted() {
        let params = DogeParams {
            rope_scaling: rope_record(json!({
                "rope_type": "llama3",
                "factor": 8.0,
                "low_freq_factor": 1.0,
                "high_freq_factor": 4.0,
                "original_max_position_embeddings": 8192,
            })),
            ..DogeParams::default()
        };
        let config = DogeConfig::new(params).unwrap();
        assert_eq!(config.max_position_embeddings(), 2048);
        assert_eq!(
            config.rope_scaling().original_max_position_embeddings(),
            Some(8192)
        );
        assert_eq!(config.rope_frequencies(None).len(), config.head_dim() / 2);
    }

    #[test]
    fn test_dimension_checks() {
        let params = DogeParams {
            hidden_size: 1000,
            num_attention_heads: 7,
            ..DogeParams::default()
        };
        let err = DogeConfig::new(params).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDimensions { .. }));
        assert_eq!(err.field(), Some("hidden_size"));

        let params = DogeParams {
            hidden_size: 24,
            num_attention_heads: 8,
            ..DogeParams::default()
        };
        assert_eq!(
            DogeConfig::new(params).unwrap_err().field(),
            Some("num_attention_heads")
        );

        let params = DogeParams {
            hidden_dropout: 1.0,
            ..DogeParams::default()
        };
        assert_eq!(DogeConfig::new(params).unwrap_err().field(), Some("hidden_dropout"));

        let params = DogeParams {
            rope_theta: 0.0,
            ..DogeParams::default()
        };
        assert_eq!(DogeConfig::new(params).unwrap_err().field(), Some("rope_theta"));
    }

    #[test]
    fn test_moe_validated_only_when_enabled() {
        let dense = DogeParams {
            num_cdmmoe_experts: 1000,
            ..DogeParams::default()
        };
        assert!(DogeConfig::new(dense.clone()).is_ok());

        let moe = DogeParams { is_moe: true, ..dense };
        assert!(matches!(
            DogeConfig::new(moe),
            Err(ConfigError::InvalidExpertRetrieval { .. })
        ));

        let moe = DogeConfig::new(DogeParams {
            is_moe: true,
            ..DogeParams::default()
        })
        .unwrap();
        let cdmoe = moe.cdmoe().unwrap();
        assert_eq!(cdmoe.num_keys(), 64);
        assert_eq!(cdmoe.active_experts_per_token(), 32);
    }

    #[test]
    fn test_model_type_mismatch() {
        let params = DogeParams {
            model_type: Some("llama".to_string()),
            ..DogeParams::default()
        };
        assert!(matches!(
            DogeConfig::new(params),
            Err(ConfigError::ModelTypeMismatch(ref t)) if t == "llama"
        ));
    }

    #[test]
    fn test_rope_frequencies_follow_config() {
        let config = DogeConfig::default();
        let freqs = config.rope_frequencies(None);
        assert_eq!(freqs.len(), config.head_dim() / 2);
        assert_eq!(freqs.attention_scaling, 1.0);
    }

    #[test]
    fn test_layer_plan_kind_indices() {
        let config = DogeConfig::new(DogeParams {
            num_hidden_layers: 8,
            attn_layer_period: 4,
            attn_layer_offset: 3,
            ..DogeParams::default()
        })
        .unwrap();
        let attn: Vec<(usize, usize)> = config
            .layer_plan()
            .into_iter()
            .filter(|slot| slot.layer_type.is_attention())
            .map(|slot| (slot.index, slot.kind_index))
            .collect();
        assert_eq!(attn, vec![(3, 0), (7, 1)]);
    }

    #[test]
    fn test_concurrent_readers() {
        let config = std::sync::Arc::new(DogeConfig::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let config = std::sync::Arc::clone(&config);
                std::thread::spawn(move || config.layers_type())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), config.layers_type());
        }
    }
}
