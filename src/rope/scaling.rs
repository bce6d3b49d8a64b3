//! RoPE scaling records and their validation.
//!
//! | rope_type | required | optional |
//! |-----------|----------|----------|
//! | default   |          |          |
//! | linear    | factor   |          |
//! | dynamic   | factor   | original_max_position_embeddings |
//! | yarn      | factor   | attention_factor, beta_fast, beta_slow, original_max_position_embeddings |
//! | longrope  | short_factor, long_factor | attention_factor, factor, original_max_position_embeddings |
//! | llama3    | factor, low_freq_factor, high_freq_factor, original_max_position_embeddings |  |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ConfigError, Result};

/// `rope_scaling` as it appears in a config document.
pub type RopeRecord = Map<String, Value>;

/// YaRN extrapolation boundary when `beta_fast` is unset.
pub const YARN_BETA_FAST: f64 = 32.0;

/// YaRN interpolation boundary when `beta_slow` is unset.
pub const YARN_BETA_SLOW: f64 = 1.0;

const RECORD_KEYS: [&str; 2] = ["rope_type", "type"];

/// The closed set of RoPE variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RopeType {
    Default,
    Linear,
    Dynamic,
    Yarn,
    Longrope,
    Llama3,
}

impl RopeType {
    pub const ALL: [RopeType; 6] = [
        RopeType::Default,
        RopeType::Linear,
        RopeType::Dynamic,
        RopeType::Yarn,
        RopeType::Longrope,
        RopeType::Llama3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RopeType::Default => "default",
            RopeType::Linear => "linear",
            RopeType::Dynamic => "dynamic",
            RopeType::Yarn => "yarn",
            RopeType::Longrope => "longrope",
            RopeType::Llama3 => "llama3",
        }
    }

    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            RopeType::Default => &[],
            RopeType::Linear | RopeType::Dynamic | RopeType::Yarn => &["factor"],
            RopeType::Longrope => &["short_factor", "long_factor"],
            RopeType::Llama3 => &[
                "factor",
                "low_freq_factor",
                "high_freq_factor",
                "original_max_position_embeddings",
            ],
        }
    }

    pub fn optional_keys(&self) -> &'static [&'static str] {
        match self {
            RopeType::Default | RopeType::Linear | RopeType::Llama3 => &[],
            RopeType::Dynamic => &["original_max_position_embeddings"],
            RopeType::Yarn => &[
                "attention_factor",
                "beta_fast",
                "beta_slow",
                "original_max_position_embeddings",
            ],
            RopeType::Longrope => &[
                "attention_factor",
                "factor",
                "original_max_position_embeddings",
            ],
        }
    }

    fn recognizes(&self, key: &str) -> bool {
        RECORD_KEYS.contains(&key)
            || self.required_keys().contains(&key)
            || self.optional_keys().contains(&key)
    }
}

impl fmt::Display for RopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RopeType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        RopeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownRopeType(s.to_string()))
    }
}

/// A validated RoPE scaling descriptor.
///
/// Every variant carries exactly the fields its `rope_type` reads, with
/// defaults already applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RopeScaling {
    #[default]
    Default,
    Linear {
        factor: f64,
    },
    Dynamic {
        factor: f64,
        original_max_position_embeddings: Option<usize>,
    },
    Yarn {
        factor: f64,
        attention_factor: Option<f64>,
        beta_fast: f64,
        beta_slow: f64,
        original_max_position_embeddings: Option<usize>,
    },
    LongRope {
        short_factor: Vec<f64>,
        long_factor: Vec<f64>,
        attention_factor: Option<f64>,
        factor: Option<f64>,
        original_max_position_embeddings: Option<usize>,
    },
    Llama3 {
        factor: f64,
        low_freq_factor: f64,
        high_freq_factor: f64,
        original_max_position_embeddings: usize,
    },
}

impl RopeScaling {
    pub fn rope_type(&self) -> RopeType {
        match self {
            RopeScaling::Default => RopeType::Default,
            RopeScaling::Linear { .. } => RopeType::Linear,
            RopeScaling::Dynamic { .. } => RopeType::Dynamic,
            RopeScaling::Yarn { .. } => RopeType::Yarn,
            RopeScaling::LongRope { .. } => RopeType::Longrope,
            RopeScaling::Llama3 { .. } => RopeType::Llama3,
        }
    }

    /// Context-extension factor, when the variant has one.
    pub fn factor(&self) -> Option<f64> {
        match self {
            RopeScaling::Default => None,
            RopeScaling::Linear { factor }
            | RopeScaling::Dynamic { factor, .. }
            | RopeScaling::Yarn { factor, .. }
            | RopeScaling::Llama3 { factor, .. } => Some(*factor),
            RopeScaling::LongRope { factor, .. } => *factor,
        }
    }

    /// Pre-training context length the variant was tuned against.
    pub fn original_max_position_embeddings(&self) -> Option<usize> {
        match self {
            RopeScaling::Default | RopeScaling::Linear { .. } => None,
            RopeScaling::Dynamic {
                original_max_position_embeddings,
                ..
            }
            | RopeScaling::Yarn {
                original_max_position_embeddings,
                ..
            }
            | RopeScaling::LongRope {
                original_max_position_embeddings,
                ..
            } => *original_max_position_embeddings,
            RopeScaling::Llama3 {
                original_max_position_embeddings,
                ..
            } => Some(*original_max_position_embeddings),
        }
    }

    /// Validate a raw `rope_scaling` record for a given head dimension.
    ///
    /// The record is read through a normalized copy; the caller's map is
    /// left untouched.
    pub fn from_record(record: &RopeRecord, head_dim: usize) -> Result<Self> {
        let record = normalize_rope_record(record);
        let rope_type = match record.get("rope_type") {
            Some(Value::String(name)) => name.parse::<RopeType>()?,
            Some(other) => {
                return Err(ConfigError::rope(
                    "rope_type",
                    format!("expected a string, got {}", json_kind(other)),
                ))
            }
            None => {
                return Err(ConfigError::rope(
                    "rope_type",
                    "missing required field (neither 'rope_type' nor legacy 'type' is set)",
                ))
            }
        };

        warn_unrecognized_keys(rope_type, &record);

        let scaling = match rope_type {
            RopeType::Default => RopeScaling::Default,
            RopeType::Linear => RopeScaling::Linear {
                factor: required_factor(&record, "factor")?,
            },
            RopeType::Dynamic => RopeScaling::Dynamic {
                factor: required_factor(&record, "factor")?,
                original_max_position_embeddings: optional_context(&record)?,
            },
            RopeType::Yarn => {
                let factor = required_factor(&record, "factor")?;
                let attention_factor = optional_attention_factor(&record)?;
                let beta_fast = optional_float(&record, "beta_fast")?.unwrap_or(YARN_BETA_FAST);
                let beta_slow = optional_float(&record, "beta_slow")?.unwrap_or(YARN_BETA_SLOW);
                if beta_fast <= beta_slow {
                    return Err(ConfigError::rope(
                        "beta_fast",
                        format!("must be greater than beta_slow ({beta_slow}), got {beta_fast}"),
                    ));
                }
                RopeScaling::Yarn {
                    factor,
                    attention_factor,
                    beta_fast,
                    beta_slow,
                    original_max_position_embeddings: optional_context(&record)?,
                }
            }
            RopeType::Longrope => {
                let short_factor = required_float_list(&record, "short_factor")?;
                let long_factor = required_float_list(&record, "long_factor")?;
                if long_factor.len() != short_factor.len() {
                    return Err(ConfigError::rope(
                        "long_factor",
                        format!(
                            "length {} does not match short_factor length {}",
                            long_factor.len(),
                            short_factor.len()
                        ),
                    ));
                }
                let expected = head_dim / 2;
                if short_factor.len() != expected {
                    return Err(ConfigError::rope(
                        "short_factor",
                        format!(
                            "expected {expected} entries (head_dim / 2), got {}",
                            short_factor.len()
                        ),
                    ));
                }
                let factor = optional_float(&record, "factor")?
                    .map(|value| check_factor("factor", value))
                    .transpose()?;
                RopeScaling::LongRope {
                    short_factor,
                    long_factor,
                    attention_factor: optional_attention_factor(&record)?,
                    factor,
                    original_max_position_embeddings: optional_context(&record)?,
                }
            }
            RopeType::Llama3 => {
                let factor = required_factor(&record, "factor")?;
                let low_freq_factor = required_float(&record, "low_freq_factor")?;
                let high_freq_factor = required_float(&record, "high_freq_factor")?;
                if high_freq_factor <= low_freq_factor {
                    return Err(ConfigError::rope(
                        "high_freq_factor",
                        format!(
                            "must be greater than low_freq_factor ({low_freq_factor}), got {high_freq_factor}"
                        ),
                    ));
                }
                let original_max_position_embeddings = optional_context(&record)?.ok_or_else(|| {
                    ConfigError::rope("original_max_position_embeddings", "missing required field")
                })?;
                RopeScaling::Llama3 {
                    factor,
                    low_freq_factor,
                    high_freq_factor,
                    original_max_position_embeddings,
                }
            }
        };

        Ok(scaling)
    }

    /// Render back to a `rope_scaling` record.
    pub fn to_record(&self) -> RopeRecord {
        let mut record = RopeRecord::new();
        record.insert("rope_type".into(), json!(self.rope_type().as_str()));
        let mut put = |key: &str, value: Value| {
            record.insert(key.to_string(), value);
        };
        match self {
            RopeScaling::Default => {}
            RopeScaling::Linear { factor } => put("factor", json!(factor)),
            RopeScaling::Dynamic {
                factor,
                original_max_position_embeddings,
            } => {
                put("factor", json!(factor));
                if let Some(context) = original_max_position_embeddings {
                    put("original_max_position_embeddings", json!(context));
                }
            }
            RopeScaling::Yarn {
                factor,
                attention_factor,
                beta_fast,
                beta_slow,
                original_max_position_embeddings,
            } => {
                put("factor", json!(factor));
                if let Some(attention) = attention_factor {
                    put("attention_factor", json!(attention));
                }
                put("beta_fast", json!(beta_fast));
                put("beta_slow", json!(beta_slow));
                if let Some(context) = original_max_position_embeddings {
                    put("original_max_position_embeddings", json!(context));
                }
            }
            RopeScaling::LongRope {
                short_factor,
                long_factor,
                attention_factor,
                factor,
                original_max_position_embeddings,
            } => {
                put("short_factor", json!(short_factor));
                put("long_factor", json!(long_factor));
                if let Some(attention) = attention_factor {
                    put("attention_factor", json!(attention));
                }
                if let Some(factor) = factor {
                    put("factor", json!(factor));
                }
                if let Some(context) = original_max_position_embeddings {
                    put("original_max_position_embeddings", json!(context));
                }
            }
            RopeScaling::Llama3 {
                factor,
                low_freq_factor,
                high_freq_factor,
                original_max_position_embeddings,
            } => {
                put("factor", json!(factor));
                put("low_freq_factor", json!(low_freq_factor));
                put("high_freq_factor", json!(high_freq_factor));
                put(
                    "original_max_position_embeddings",
                    json!(original_max_position_embeddings),
                );
            }
        }
        record
    }
}

/// Copy of `record` with the legacy `type` key mirrored into `rope_type`.
///
/// When both keys are present, `type` overwrites `rope_type` in the copy.
pub fn normalize_rope_record(record: &RopeRecord) -> RopeRecord {
    let mut normalized = record.clone();
    if let Some(legacy) = record.get("type") {
        normalized.insert("rope_type".to_string(), legacy.clone());
    }
    normalized
}

/// Validate an optional `rope_scaling` record; absence means default RoPE.
pub fn validate_rope_scaling(record: Option<&RopeRecord>, head_dim: usize) -> Result<RopeScaling> {
    match record {
        None => Ok(RopeScaling::Default),
        Some(record) => RopeScaling::from_record(record, head_dim),
    }
}

fn warn_unrecognized_keys(rope_type: RopeType, record: &RopeRecord) {
    let unknown: Vec<&str> = record
        .keys()
        .map(String::as_str)
        .filter(|key| !rope_type.recognizes(key))
        .collect();
    if !unknown.is_empty() {
        tracing::warn!(
            rope_type = %rope_type,
            keys = ?unknown,
            "unrecognized keys in rope_scaling"
        );
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn optional_float(record: &RopeRecord, key: &str) -> Result<Option<f64>> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| ConfigError::rope(key, "must be a finite number")),
        Some(other) => Err(ConfigError::rope(
            key,
            format!("expected a number, got {}", json_kind(other)),
        )),
    }
}

fn required_float(record: &RopeRecord, key: &str) -> Result<f64> {
    optional_float(record, key)?.ok_or_else(|| ConfigError::rope(key, "missing required field"))
}

fn check_factor(key: &str, value: f64) -> Result<f64> {
    if value <= 0.0 {
        return Err(ConfigError::rope(key, format!("must be > 0, got {value}")));
    }
    if value < 1.0 {
        tracing::warn!(field = key, value, "rope scaling factor below 1 shrinks the context");
    }
    Ok(value)
}

fn required_factor(record: &RopeRecord, key: &str) -> Result<f64> {
    check_factor(key, required_float(record, key)?)
}

fn optional_attention_factor(record: &RopeRecord) -> Result<Option<f64>> {
    match optional_float(record, "attention_factor")? {
        Some(value) if value < 0.0 => Err(ConfigError::rope(
            "attention_factor",
            format!("must be >= 0, got {value}"),
        )),
        other => Ok(other),
    }
}

fn optional_context(record: &RopeRecord) -> Result<Option<usize>> {
    const KEY: &str = "original_max_position_embeddings";
    match record.get(KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_u64().and_then(|v| usize::try_from(v).ok()) {
            Some(0) => Err(ConfigError::rope(KEY, "must be > 0")),
            Some(context) => Ok(Some(context)),
            None => Err(ConfigError::rope(
                KEY,
                format!("expected a non-negative integer, got {n}"),
            )),
        },
        Some(other) => Err(ConfigError::rope(
            KEY,
            format!("expected an integer, got {}", json_kind(other)),
        )),
    }
}

fn required_float_list(record: &RopeRecord, key: &str) -> Result<Vec<f64>> {
    let items = match record.get(key) {
        None | Some(Value::Null) => return Err(ConfigError::rope(key, "missing required field")),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ConfigError::rope(
                key,
                format!("expected a list of numbers, got {}", json_kind(other)),
            ))
        }
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item.as_f64() {
            Some(v) if v.is_finite() && v > 0.0 => Ok(v),
            Some(v) => Err(ConfigError::rope(
                key,
                format!("entry {i} must be a positive number, got {v}"),
            )),
            None => Err(ConfigError::rope(
                key,
                format!("entry {i} is {}, expected a number", json_kind(item)),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> RopeRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be a JSON object"),
        }
    }

    fn rope_field(err: &ConfigError) -> &str {
        match err {
            ConfigError::InvalidRopeScaling { field, .. } => field.as_str(),
            other => panic!("expected InvalidRopeScaling, got {other:?}"),
        }
    }

    #[test]
    fn test_absent_record_is_default() {
        assert_eq!(validate_rope_scaling(None, 128).unwrap(), RopeScaling::Default);
    }

    #[test]
    fn test_explicit_default() {
        let r = record(json!({"rope_type": "default"}));
        assert_eq!(RopeScaling::from_record(&r, 128).unwrap(), RopeScaling::Default);
    }

    #[test]
    fn test_legacy_type_key_matches_rope_type() {
        let legacy = record(json!({"type": "yarn", "factor": 2.0}));
        let modern = record(json!({"rope_type": "yarn", "factor": 2.0}));
        let a = RopeScaling::from_record(&legacy, 128).unwrap();
        let b = RopeScaling::from_record(&modern, 128).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.rope_type(), RopeType::Yarn);
    }

    #[test]
    fn test_normalization_leaves_input_alone() {
        let legacy = record(json!({"type": "linear", "factor": 4.0}));
        let normalized = normalize_rope_record(&legacy);
        assert!(!legacy.contains_key("rope_type"));
        assert_eq!(normalized["rope_type"], json!("linear"));
        assert_eq!(normalized["type"], json!("linear"));
    }

    #[test]
    fn test_legacy_type_overrides_rope_type() {
        let both = record(json!({"rope_type": "linear", "type": "dynamic", "factor": 2.0}));
        let scaling = RopeScaling::from_record(&both, 64).unwrap();
        assert_eq!(
            scaling,
            RopeScaling::Dynamic {
                factor: 2.0,
                original_max_position_embeddings: None,
            }
        );

        let normalized = normalize_rope_record(&both);
        assert_eq!(normalized["rope_type"], json!("dynamic"));
        assert_eq!(both["rope_type"], json!("linear"));
    }

    #[test]
    fn test_unknown_rope_type() {
        let r = record(json!({"rope_type": "ntk-by-parts", "factor": 2.0}));
        let err = RopeScaling::from_record(&r, 64).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRopeType(ref name) if name == "ntk-by-parts"));
    }

    #[test]
    fn test_missing_rope_type() {
        let r = record(json!({"factor": 2.0}));
        let err = RopeScaling::from_record(&r, 64).unwrap_err();
        assert_eq!(rope_field(&err), "rope_type");
    }

    #[test]
    fn test_linear_requires_positive_factor() {
        let missing = record(json!({"rope_type": "linear"}));
        let err = RopeScaling::from_record(&missing, 64).unwrap_err();
        assert_eq!(rope_field(&err), "factor");
        assert!(err.to_string().contains("missing"));

        let zero = record(json!({"rope_type": "linear", "factor": 0.0}));
        let err = RopeScaling::from_record(&zero, 64).unwrap_err();
        assert_eq!(rope_field(&err), "factor");

        let below_one = record(json!({"rope_type": "linear", "factor": 0.5}));
        assert_eq!(
            RopeScaling::from_record(&below_one, 64).unwrap(),
            RopeScaling::Linear { factor: 0.5 }
        );
    }

    #[test]
    fn test_factor_wrong_type() {
        let r = record(json!({"rope_type": "dynamic", "factor": "2.0"}));
        let err = RopeScaling::from_record(&r, 64).unwrap_err();
        assert_eq!(rope_field(&err), "factor");
        assert!(err.to_string().contains("a string"));
    }

    #[test]
    fn test_integer_factor_accepted() {
        let r = record(json!({"rope_type": "dynamic", "factor": 4, "original_max_position_embeddings": 2048}));
        assert_eq!(
            RopeScaling::from_record(&r, 64).unwrap(),
            RopeScaling::Dynamic {
                factor: 4.0,
                original_max_position_embeddings: Some(2048),
            }
        );
    }

    #[test]
    fn test_yarn_defaults() {
        let r = record(json!({"rope_type": "yarn", "factor": 4.0}));
        match RopeScaling::from_record(&r, 64).unwrap() {
            RopeScaling::Yarn {
                beta_fast,
                beta_slow,
                attention_factor,
                ..
            } => {
                assert_eq!(beta_fast, YARN_BETA_FAST);
                assert_eq!(beta_slow, YARN_BETA_SLOW);
                assert!(attention_factor.is_none());
            }
            other => panic!("expected yarn, got {other:?}"),
        }
    }

    // Ordering check; relax here if a released checkpoint ships inverted betas.
    #[test]
    fn test_yarn_beta_fast_must_exceed_beta_slow() {
        let r = record(json!({"rope_type": "yarn", "factor": 2.0, "beta_fast": 1, "beta_slow": 32}));
        let err = RopeScaling::from_record(&r, 64).unwrap_err();
        assert_eq!(rope_field(&err), "beta_fast");
    }

    #[test]
    fn test_yarn_negative_attention_factor() {
        let r = record(json!({"rope_type": "yarn", "factor": 2.0, "attention_factor": -0.5}));
        let err = RopeScaling::from_record(&r, 64).unwrap_err();
        assert_eq!(rope_field(&err), "attention_factor");
    }

    #[test]
    fn test_longrope_lengths() {
        let k = 32;
        let ok = record(json!({
            "rope_type": "longrope",
            "short_factor": vec![1.0; k],
            "long_factor": vec![1.5; k],
        }));
        let scaling = RopeScaling::from_record(&ok, 2 * k).unwrap();
        assert_eq!(scaling.rope_type(), RopeType::Longrope);

        let mismatch = record(json!({
            "rope_type": "longrope",
            "short_factor": vec![1.0; k],
            "long_factor": vec![1.0; k + 1],
        }));
        let err = RopeScaling::from_record(&mismatch, 2 * k).unwrap_err();
        assert_eq!(rope_field(&err), "long_factor");

        // Mismatched lengths name long_factor even when short is also off.
        let err = RopeScaling::from_record(&mismatch, 4 * k).unwrap_err();
        assert_eq!(rope_field(&err), "long_factor");

        let wrong_dim = record(json!({
            "rope_type": "longrope",
            "short_factor": vec![1.0; 4],
            "long_factor": vec![1.0; 4],
        }));
        let err = RopeScaling::from_record(&wrong_dim, 64).unwrap_err();
        assert_eq!(rope_field(&err), "short_factor");
        assert!(err.to_string().contains("expected 32"));
    }

    #[test]
    fn test_longrope_rejects_non_numeric_entries() {
        let r = record(json!({
            "rope_type": "longrope",
            "short_factor": [1.0, "x"],
            "long_factor": [1.0, 1.0],
        }));
        let err = RopeScaling::from_record(&r, 4).unwrap_err();
        assert_eq!(rope_field(&err), "short_factor");
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn test_llama3() {
        let r = record(json!({
            "rope_type": "llama3",
            "factor": 8.0,
            "low_freq_factor": 1.0,
            "high_freq_factor": 4.0,
            "original_max_position_embeddings": 8192,
        }));
        let scaling = RopeScaling::from_record(&r, 128).unwrap();
        assert_eq!(scaling.factor(), Some(8.0));
        assert_eq!(scaling.original_max_position_embeddings(), Some(8192));
    }

    // Ordering check; relax here if a released checkpoint ships inverted bands.
    #[test]
    fn test_llama3_high_must_exceed_low() {
        let r = record(json!({
            "rope_type": "llama3",
            "factor": 8.0,
            "low_freq_factor": 4.0,
            "high_freq_factor": 4.0,
            "original_max_position_embeddings": 8192,
        }));
        let err = RopeScaling::from_record(&r, 128).unwrap_err();
        assert_eq!(rope_field(&err), "high_freq_factor");
    }

    #[test]
    fn test_llama3_requires_original_context() {
        let r = record(json!({
            "rope_type": "llama3",
            "factor": 8.0,
            "low_freq_factor": 1.0,
            "high_freq_factor": 4.0,
        }));
        let err = RopeScaling::from_record(&r, 128).unwrap_err();
        assert_eq!(rope_field(&err), "original_max_position_embeddings");
    }

    #[test]
    fn test_context_must_be_positive_integer() {
        let r = record(json!({"rope_type": "dynamic", "factor": 2.0, "original_max_position_embeddings": 2048.5}));
        let err = RopeScaling::from_record(&r, 64).unwrap_err();
        assert_eq!(rope_field(&err), "original_max_position_embeddings");

        let r = record(json!({"rope_type": "dynamic", "factor": 2.0, "original_max_position_embeddings": 0}));
        assert!(RopeScaling::from_record(&r, 64).is_err());
    }

    #[test]
    fn test_unrecognized_keys_are_tolerated() {
        let r = record(json!({"rope_type": "linear", "factor": 2.0, "mscale": 0.7}));
        assert_eq!(
            RopeScaling::from_record(&r, 64).unwrap(),
            RopeScaling::Linear { factor: 2.0 }
        );
    }

    #[test]
    fn test_to_record_revalidates_to_same_value() {
        let scalings = [
            RopeScaling::Default,
            RopeScaling::Linear { factor: 2.0 },
            RopeScaling::Yarn {
                factor: 4.0,
                attention_factor: Some(1.2),
                beta_fast: 32.0,
                beta_slow: 1.0,
                original_max_position_embeddings: Some(4096),
            },
            RopeScaling::Llama3 {
                factor: 8.0,
                low_freq_factor: 1.0,
                high_freq_factor: 4.0,
                original_max_position_embeddings: 8192,
            },
        ];
        for scaling in scalings {
            let back = RopeScaling::from_record(&scaling.to_record(), 128).unwrap();
            assert_eq!(back, scaling);
        }
    }

    #[test]
    fn test_rope_type_names() {
        for rope_type in RopeType::ALL {
            assert_eq!(rope_type.as_str().parse::<RopeType>().unwrap(), rope_type);
            assert_eq!(
                serde_json::to_value(rope_type).unwrap(),
                json!(rope_type.as_str())
            );
        }
    }
}
