//! Core data models for the tax advisory pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Regime {
    #[serde(rename = "Old Regime")]
    Old,
    #[serde(rename = "New Regime")]
    New,
}

//
// ================= Inputs =================
//

/// A single bank transaction as read from the data store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub description: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(description: impl Into<String>, amount: f64) -> Self {
        Self {
            description: description.into(),
            amount,
        }
    }
}

/// Financial facts pulled out of the transactions by the inference step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedFacts {
    pub total_income: f64,
    pub deduction_80c: f64,
    pub deduction_80d: f64,
    pub findings: Vec<String>,
}

//
// ================= Results =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegimeResult {
    pub regime: Regime,
    pub taxable_income: i64,
    /// Truncated toward zero to whole currency units
    pub tax_owed: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxComparison {
    pub old_regime_tax: i64,
    pub new_regime_tax: i64,
    pub savings: i64,
    pub recommendation: Regime,
}

impl TaxComparison {
    /// Ties go to the new regime.
    pub fn from_results(old: &RegimeResult, new: &RegimeResult) -> Self {
        let recommendation = if new.tax_owed <= old.tax_owed {
            Regime::New
        } else {
            Regime::Old
        };

        Self {
            old_regime_tax: old.tax_owed,
            new_regime_tax: new.tax_owed,
            savings: (old.tax_owed - new.tax_owed).abs(),
            recommendation,
        }
    }
}

//
// ================= Response =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedDeductions {
    #[serde(rename = "80c")]
    pub section_80c: f64,
    #[serde(rename = "80d")]
    pub section_80d: f64,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomeAnalysis {
    pub total_income: f64,
    pub detected_deductions: DetectedDeductions,
}

impl From<ExtractedFacts> for IncomeAnalysis {
    fn from(facts: ExtractedFacts) -> Self {
        Self {
            total_income: facts.total_income,
            detected_deductions: DetectedDeductions {
                section_80c: facts.deduction_80c,
                section_80d: facts.deduction_80d,
                sources: facts.findings,
            },
        }
    }
}

/// Final payload returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxAnalysis {
    pub analysis: IncomeAnalysis,
    pub tax_comparison: TaxComparison,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::Old => "Old Regime",
            Regime::New => "New Regime",
        };
        write!(f, "{}", s)
    }
}
