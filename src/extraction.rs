//! Fact extraction through the inference provider
//!
//! Builds the instruction prompt from recent transactions, runs it through
//! the [`ResilientInvoker`], and validates the free-form reply into
//! [`ExtractedFacts`]. The reply is only partially trusted: absent or null
//! fields fall back to zero / empty, negative amounts are clamped, but text
//! that is not a JSON object is rejected as `MalformedResponse`.

use crate::error::AdvisoryError;
use crate::gemini::InferenceProvider;
use crate::models::{ExtractedFacts, Transaction};
use crate::retry::ResilientInvoker;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Transactions embedded in a single prompt
pub const MAX_PROMPT_TRANSACTIONS: usize = 50;

pub fn build_prompt(transactions: &[Transaction]) -> String {
    let summary = transactions
        .iter()
        .take(MAX_PROMPT_TRANSACTIONS)
        .map(|t| format!("{}: {}", t.description, t.amount))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Act as an Indian Chartered Accountant. Analyze these bank transactions:
{}

Tasks:
1. Calculate 'total_income' (sum of salary, credits and any transaction starting with 'Received from').
2. Identify 'deductions_80c' (PPF, LIC, ELSS, EPF).
3. Identify 'deductions_80d' (medical insurance).
4. List the names of deduction sources found in 'findings'.

Return ONLY valid JSON with this format, no explanation text:
{{ "total_income": 0, "deductions_80c": 0, "deductions_80d": 0, "findings": ["list names"] }}
"#,
        summary
    )
}

/// Remove a leading ```json / ``` fence and a trailing ``` fence.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[derive(Debug, Deserialize)]
struct RawFacts {
    #[serde(default)]
    total_income: Option<f64>,
    #[serde(default)]
    deductions_80c: Option<f64>,
    #[serde(default)]
    deductions_80d: Option<f64>,
    #[serde(default)]
    findings: Option<Vec<String>>,
}

pub(crate) fn non_negative(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0)
}

/// Decode a provider reply that must be a single JSON object, fenced or not.
pub fn parse_json_object<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let cleaned = strip_code_fences(reply);

    let value: serde_json::Value = serde_json::from_str(cleaned).map_err(|e| {
        warn!(error = %e, "Inference reply is not valid JSON");
        AdvisoryError::MalformedResponse(e.to_string())
    })?;

    if !value.is_object() {
        return Err(AdvisoryError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Inference reply has unexpected field types");
        AdvisoryError::MalformedResponse(e.to_string())
    })
}

/// Validate a provider reply into structured facts.
pub fn parse_facts(reply: &str) -> Result<ExtractedFacts> {
    let raw: RawFacts = parse_json_object(reply)?;

    Ok(ExtractedFacts {
        total_income: non_negative(raw.total_income),
        deduction_80c: non_negative(raw.deductions_80c),
        deduction_80d: non_negative(raw.deductions_80d),
        findings: raw.findings.unwrap_or_default(),
    })
}

/// Prompt + call + parse, with the call guarded by a retry policy.
#[derive(Clone)]
pub struct FactExtractor {
    provider: Arc<dyn InferenceProvider>,
    invoker: ResilientInvoker,
}

impl FactExtractor {
    pub fn new(provider: Arc<dyn InferenceProvider>, invoker: ResilientInvoker) -> Self {
        Self { provider, invoker }
    }

    /// Send one prompt to the provider under the retry policy.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let provider = self.provider.as_ref();
        self.invoker
            .invoke(move || provider.generate(prompt))
            .await
    }

    pub async fn extract(&self, transactions: &[Transaction]) -> Result<ExtractedFacts> {
        let reply = self.complete(&build_prompt(transactions)).await?;

        let facts = parse_facts(&reply)?;

        info!(
            total_income = facts.total_income,
            deduction_80c = facts.deduction_80c,
            deduction_80d = facts.deduction_80d,
            findings = facts.findings.len(),
            "Extracted financial facts"
        );

        Ok(facts)
    }
}
