//! Expert-retrieval hyperparameters for the CDMoE feed-forward block.

use serde::Serialize;

use crate::error::{ConfigError, Result};

/// Validated CDMoE retrieval configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CdmoeConfig {
    /// Total private experts (a perfect square).
    num_experts: usize,

    /// Retrieval heads per token.
    num_heads: usize,

    /// Experts each head selects.
    experts_per_head: usize,

    /// Width of the retrieval query.
    retrieval_size: usize,
}

impl CdmoeConfig {
    pub fn new(
        num_experts: usize,
        num_heads: usize,
        experts_per_head: usize,
        retrieval_size: usize,
    ) -> Result<Self> {
        for (field, value) in [
            ("num_cdmmoe_experts", num_experts),
            ("num_cdmmoe_heads", num_heads),
            ("num_cdmmoe_experts_per_head", experts_per_head),
            ("expert_retrieval_size", retrieval_size),
        ] {
            if value == 0 {
                return Err(ConfigError::experts(field, "must be at least 1"));
            }
        }

        let num_keys = exact_sqrt(num_experts).ok_or_else(|| {
            ConfigError::experts(
                "num_cdmmoe_experts",
                format!("must be a perfect square for product-key retrieval, got {num_experts}"),
            )
        })?;

        if experts_per_head > num_keys {
            return Err(ConfigError::experts(
                "num_cdmmoe_experts_per_head",
                format!(
                    "cannot exceed the {num_keys} sub-keys per side, got {experts_per_head}"
                ),
            ));
        }

        if retrieval_size % 2 != 0 {
            return Err(ConfigError::experts(
                "expert_retrieval_size",
                format!("must be even to split into two sub-queries, got {retrieval_size}"),
            ));
        }

        Ok(Self {
            num_experts,
            num_heads,
            experts_per_head,
            retrieval_size,
        })
    }

    pub fn num_experts(&self) -> usize {
        self.num_experts
    }

    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    pub fn experts_per_head(&self) -> usize {
        self.experts_per_head
    }

    pub fn retrieval_size(&self) -> usize {
        self.retrieval_size
    }

    /// Sub-keys per product-key side (`sqrt(num_experts)`).
    pub fn num_keys(&self) -> usize {
        // Construction guarantees a perfect square.
        exact_sqrt(self.num_experts).unwrap_or(0)
    }

    /// Width of each half-query.
    pub fn sub_query_size(&self) -> usize {
        self.retrieval_size / 2
    }

    /// Experts mixed into each token's output.
    pub fn active_experts_per_token(&self) -> usize {
        self.num_heads * self.experts_per_head
    }

    /// Fraction of experts touched per token.
    pub fn sparsity(&self) -> f32 {
        self.active_experts_per_token() as f32 / self.num_experts as f32
    }
}

fn exact_sqrt(n: usize) -> Option<usize> {
    let mut root = (n as f64).sqrt() as usize;
    // Float rounding can land one off in either direction.
    while root.checked_mul(root).map_or(true, |square| square > n) {
        root -= 1;
    }
    while (root + 1)
        .checked_mul(root + 1)
        .is_some_and(|square| square <= n)
    {
        root += 1;
    }
    (root * root == n).then_some(root)
}
