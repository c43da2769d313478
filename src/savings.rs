//! Savings insights
//!
//! A second prompt over the same recent transactions, asking the model for
//! monthly income, monthly expense, a savings estimate and the spends it
//! considers wasteful. The reply goes through the same parse boundary as
//! fact extraction; current savings are derived locally rather than trusted
//! from the model.

use crate::extraction::{non_negative, parse_json_object, MAX_PROMPT_TRANSACTIONS};
use crate::models::Transaction;
use crate::Result;
use serde::{Deserialize, Serialize};

pub fn build_savings_prompt(transactions: &[Transaction]) -> String {
    let summary = transactions
        .iter()
        .take(MAX_PROMPT_TRANSACTIONS)
        .map(|t| format!("{}: {}", t.description, t.amount))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze the finances in these bank transactions:
{}

Return ONLY valid JSON with this format, no explanation text:
{{ "monthly_income": 0, "monthly_expense": 0, "potential_savings": 0, "wasteful_spends": ["description"], "ai_advice": "string" }}
"#,
        summary
    )
}

/// Savings view returned to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsInsights {
    pub monthly_income: f64,
    pub monthly_expense: f64,
    /// Income minus expense; negative when the user overspends.
    pub current_savings: f64,
    pub potential_savings: f64,
    pub wasteful_spends: Vec<String>,
    pub ai_advice: String,
}

#[derive(Debug, Deserialize)]
struct RawSavings {
    #[serde(default)]
    monthly_income: Option<f64>,
    #[serde(default)]
    monthly_expense: Option<f64>,
    #[serde(default)]
    potential_savings: Option<f64>,
    #[serde(default)]
    wasteful_spends: Option<Vec<String>>,
    #[serde(default)]
    ai_advice: Option<String>,
}

/// Validate a provider reply into savings insights.
pub fn parse_savings(reply: &str) -> Result<SavingsInsights> {
    let raw: RawSavings = parse_json_object(reply)?;

    let monthly_income = non_negative(raw.monthly_income);
    let monthly_expense = non_negative(raw.monthly_expense);

    Ok(SavingsInsights {
        monthly_income,
        monthly_expense,
        current_savings: monthly_income - monthly_expense,
        potential_savings: non_negative(raw.potential_savings),
        wasteful_spends: raw.wasteful_spends.unwrap_or_default(),
        ai_advice: raw.ai_advice.unwrap_or_default(),
    })
}
