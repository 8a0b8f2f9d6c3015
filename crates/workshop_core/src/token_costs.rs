//! Token usage cost reporting for agent invocations.
//!
//! Agent frameworks expose accumulated usage as camelCase JSON
//! (`latencyMs`, `inputTokens`, `outputTokens`). This module prices that usage
//! with per-million-token rates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_INPUT_COST_PER_MILLION: f64 = 3.00;
pub const DEFAULT_OUTPUT_COST_PER_MILLION: f64 = 15.00;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

#[derive(Debug, Error)]
pub enum CostReportError {
    #[error("invalid agent metrics document")]
    InvalidMetrics(#[from] serde_json::Error),
    #[error("token price must be a finite, non-negative number (got {0})")]
    InvalidPrice(f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatedMetrics {
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatedUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AgentMetrics {
    pub accumulated_metrics: AccumulatedMetrics,
    pub accumulated_usage: AccumulatedUsage,
}

impl AgentMetrics {
    pub fn from_json(raw: &str) -> Result<Self, CostReportError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for TokenPricing {
    fn default() -> Self {
        Self {
            input_per_million: DEFAULT_INPUT_COST_PER_MILLION,
            output_per_million: DEFAULT_OUTPUT_COST_PER_MILLION,
        }
    }
}

impl TokenPricing {
    pub fn new(input_per_million: f64, output_per_million: f64) -> Result<Self, CostReportError> {
        for price in [input_per_million, output_per_million] {
            if !price.is_finite() || price < 0.0 {
                return Err(CostReportError::InvalidPrice(price));
            }
        }
        Ok(Self {
            input_per_million,
            output_per_million,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct CostBreakdown {
    pub latency_seconds: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

pub fn compute_costs(metrics: &AgentMetrics, pricing: &TokenPricing) -> CostBreakdown {
    let usage = metrics.accumulated_usage;
    let input_cost = (usage.input_tokens as f64 / TOKENS_PER_MILLION) * pricing.input_per_million;
    let output_cost =
        (usage.output_tokens as f64 / TOKENS_PER_MILLION) * pricing.output_per_million;

    CostBreakdown {
        latency_seconds: metrics.accumulated_metrics.latency_ms as f64 / 1_000.0,
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
    }
}

impl std::fmt::Display for CostBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Time to research = {} seconds", self.latency_seconds)?;
        writeln!(f, "Input Token Costs = ${:.6}", self.input_cost)?;
        writeln!(f, "Output Token Costs = ${:.6}", self.output_cost)?;
        write!(f, "Total Token Costs = ${:.6}", self.total_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(input_tokens: u64, output_tokens: u64, latency_ms: u64) -> AgentMetrics {
        AgentMetrics {
            accumulated_metrics: AccumulatedMetrics { latency_ms },
            accumulated_usage: AccumulatedUsage {
                input_tokens,
                output_tokens,
                total_tokens: None,
            },
        }
    }

    #[test]
    fn prices_one_million_tokens_at_default_rates() {
        let breakdown = compute_costs(&metrics(1_000_000, 1_000_000, 2_500), &TokenPricing::default());
        assert!((breakdown.input_cost - 3.0).abs() < 1e-9);
        assert!((breakdown.output_cost - 15.0).abs() < 1e-9);
        assert!((breakdown.total_cost - 18.0).abs() < 1e-9);
        assert!((breakdown.latency_seconds - 2.5).abs() < 1e-9);
    }

    #[test]
    fn parses_agent_metrics_document() {
        let parsed = AgentMetrics::from_json(
            r#"{
                "accumulated_metrics": {"latencyMs": 1200},
                "accumulated_usage": {"inputTokens": 2000, "outputTokens": 500, "totalTokens": 2500}
            }"#,
        )
        .expect("metrics should parse");

        assert_eq!(parsed.accumulated_usage.input_tokens, 2_000);
        assert_eq!(parsed.accumulated_usage.total_tokens, Some(2_500));
        assert_eq!(parsed.accumulated_metrics.latency_ms, 1_200);
    }

    #[test]
    fn rejects_metrics_without_usage() {
        let error = AgentMetrics::from_json(r#"{"accumulated_metrics": {"latencyMs": 1}}"#)
            .expect_err("usage is required");
        assert!(matches!(error, CostReportError::InvalidMetrics(_)));
    }

    #[test]
    fn rejects_negative_prices() {
        let error = TokenPricing::new(-1.0, 15.0).expect_err("negative price should fail");
        assert!(matches!(error, CostReportError::InvalidPrice(_)));
    }

    #[test]
    fn renders_human_readable_summary() {
        let breakdown = compute_costs(&metrics(500_000, 0, 1_000), &TokenPricing::default());
        let rendered = breakdown.to_string();
        assert!(rendered.contains("Time to research = 1 seconds"));
        assert!(rendered.contains("Input Token Costs = $1.500000"));
        assert!(rendered.contains("Total Token Costs = $1.500000"));
    }
}
