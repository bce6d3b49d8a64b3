//! Inverse-frequency tables for each RoPE variant.
//!
//! Base table: `inv_freq[j] = 1 / θ^(2j / d)` for `j ∈ [0, d/2)`, where `d`
//! is the attention head dimension. Each scaling variant rewrites this table
//! and may also return a multiplier for the attention logits.

use std::f64::consts::PI;

use ndarray::Array1;

use super::scaling::RopeScaling;

/// Model quantities the frequency table depends on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RopeGeometry {
    /// Attention head dimension (even).
    pub head_dim: usize,

    /// RoPE base period θ.
    pub theta: f64,

    /// Context length the model is configured for.
    pub max_position_embeddings: usize,
}

/// Rotary frequencies for one configuration.
#[derive(Clone, Debug)]
pub struct RopeFrequencies {
    /// Inverse frequencies, length `head_dim / 2`.
    pub inv_freq: Array1<f32>,

    /// Multiplier applied to cos/sin (YaRN and LongRoPE only; 1 otherwise).
    pub attention_scaling: f32,
}

impl RopeFrequencies {
    /// Frequencies for `scaling` at an optional runtime sequence length.
    ///
    /// `seq_len` only matters for `dynamic` (NTK rescale grows with length)
    /// and `longrope` (long factors kick in past the original context).
    /// LongRoPE factor lists must hold `head_dim / 2` entries, which a
    /// validated config guarantees.
    pub fn compute(scaling: &RopeScaling, geometry: RopeGeometry, seq_len: Option<usize>) -> Self {
        let (inv_freq, attention_scaling) = match scaling {
            RopeScaling::Default => (base_inv_freq(geometry.head_dim, geometry.theta), 1.0),
            RopeScaling::Linear { factor } => (
                base_inv_freq(geometry.head_dim, geometry.theta).mapv(|f| f / factor),
                1.0,
            ),
            RopeScaling::Dynamic { factor, .. } => (dynamic_ntk(geometry, *factor, seq_len), 1.0),
            RopeScaling::Yarn {
                factor,
                attention_factor,
                beta_fast,
                beta_slow,
                original_max_position_embeddings,
            } => {
                let context = original_max_position_embeddings.unwrap_or(geometry.max_position_embeddings);
                let inv_freq = yarn(geometry, *factor, *beta_fast, *beta_slow, context);
                (inv_freq, attention_factor.unwrap_or_else(|| yarn_mscale(*factor)))
            }
            RopeScaling::LongRope {
                short_factor,
                long_factor,
                attention_factor,
                factor,
                original_max_position_embeddings,
            } => {
                let context = original_max_position_embeddings.unwrap_or(geometry.max_position_embeddings);
                let ext = match seq_len {
                    Some(len) if len > context => long_factor,
                    _ => short_factor,
                };
                let base = base_inv_freq(geometry.head_dim, geometry.theta);
                let inv_freq = &base / &Array1::from_vec(ext.clone());
                let factor = factor
                    .unwrap_or(geometry.max_position_embeddings as f64 / context as f64);
                let mscale = attention_factor.unwrap_or_else(|| longrope_mscale(factor, context));
                (inv_freq, mscale)
            }
            RopeScaling::Llama3 {
                factor,
                low_freq_factor,
                high_freq_factor,
                original_max_position_embeddings,
            } => (
                llama3(
                    geometry,
                    *factor,
                    *low_freq_factor,
                    *high_freq_factor,
                    *original_max_position_embeddings,
                ),
                1.0,
            ),
        };

        Self {
            inv_freq: inv_freq.mapv(|f| f as f32),
            attention_scaling: attention_scaling as f32,
        }
    }

    /// Number of rotated pairs (`head_dim / 2`).
    pub fn len(&self) -> usize {
        self.inv_freq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inv_freq.is_empty()
    }

    /// Wavelength (in positions) of each rotated pair.
    pub fn wavelengths(&self) -> Array1<f32> {
        self.inv_freq.mapv(|f| 2.0 * std::f32::consts::PI / f)
    }
}

fn base_inv_freq(dim: usize, theta: f64) -> Array1<f64> {
    (0..dim)
        .step_by(2)
        .map(|i| 1.0 / theta.powf(i as f64 / dim as f64))
        .collect()
}

fn dynamic_ntk(geometry: RopeGeometry, factor: f64, seq_len: Option<usize>) -> Array1<f64> {
    let dim = geometry.head_dim;
    let max_pos = geometry.max_position_embeddings as f64;
    let len = seq_len.map_or(max_pos, |l| (l as f64).max(max_pos));
    let theta = if dim > 2 {
        let stretch = factor * len / max_pos - (factor - 1.0);
        geometry.theta * stretch.powf(dim as f64 / (dim as f64 - 2.0))
    } else {
        geometry.theta
    };
    base_inv_freq(dim, theta)
}

/// Dimension index whose wavelength completes `rotations` turns over `context`.
fn correction_dim(rotations: f64, dim: usize, theta: f64, context: usize) -> f64 {
    dim as f64 * (context as f64 / (rotations * 2.0 * PI)).ln() / (2.0 * theta.ln())
}

fn linear_ramp(low: f64, high: f64, n: usize) -> Array1<f64> {
    let high = if low == high { high + 0.001 } else { high };
    (0..n)
        .map(|i| ((i as f64 - low) / (high - low)).clamp(0.0, 1.0))
        .collect()
}

fn yarn(geometry: RopeGeometry, factor: f64, beta_fast: f64, beta_slow: f64, context: usize) -> Array1<f64> {
    let dim = geometry.head_dim;
    let extrapolation = base_inv_freq(dim, geometry.theta);
    let interpolation = extrapolation.mapv(|f| f / factor);

    let low = correction_dim(beta_fast, dim, geometry.theta, context).floor().max(0.0);
    let high = correction_dim(beta_slow, dim, geometry.theta, context)
        .ceil()
        .min(dim as f64 - 1.0);

    // 0 keeps the extrapolated (original) frequency, 1 takes the interpolated one.
    let ramp = linear_ramp(low, high, dim / 2);
    &interpolation * &ramp + &extrapolation * &ramp.mapv(|r| 1.0 - r)
}

fn yarn_mscale(factor: f64) -> f64 {
    if factor <= 1.0 {
        1.0
    } else {
        0.1 * factor.ln() + 1.0
    }
}

fn longrope_mscale(factor: f64, context: usize) -> f64 {
    if factor <= 1.0 {
        1.0
    } else {
        (1.0 + factor.ln() / (context as f64).ln()).sqrt()
    }
}

fn llama3(geometry: RopeGeometry, factor: f64, low_freq_factor: f64, high_freq_factor: f64, context: usize) -> Array1<f64> {
    let context = context as f64;
    let low_freq_wavelen = context / low_freq_factor;
    let high_freq_wavelen = context / high_freq_factor;

    base_inv_freq(geometry.head_dim, geometry.theta).mapv(|f| {
        let wavelen = 2.0 * PI / f;
        if wavelen < high_freq_wavelen {
            f
        } else if wavelen > low_freq_wavelen {
            f / factor
        } else {
            let smooth = (context / wavelen - low_freq_factor) / (high_freq_factor - low_freq_factor);
            (1.0 - smooth) * f / factor + smooth * f
        }
    })
}
