//! Tax advisory orchestrator
//!
//! FETCH → EXTRACT → COMPUTE → COMPOSE, one pass per request with no state
//! kept between requests.

use crate::error::AdvisoryError;
use crate::extraction::FactExtractor;
use crate::models::{TaxAnalysis, TaxComparison, Transaction};
use crate::regime::{assess_new_regime, assess_old_regime};
use crate::savings::{build_savings_prompt, parse_savings, SavingsInsights};
use crate::store::TransactionStore;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Transactions fetched per analysis
pub const MAX_ANALYSIS_TRANSACTIONS: usize = 50;

pub struct TaxAdvisor {
    store: Arc<dyn TransactionStore>,
    extractor: FactExtractor,
}

impl TaxAdvisor {
    pub fn new(store: Arc<dyn TransactionStore>, extractor: FactExtractor) -> Self {
        Self { store, extractor }
    }

    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    async fn fetch(&self, request_id: Uuid, user_id: &str) -> Result<Vec<Transaction>> {
        let transactions = self
            .store
            .recent_transactions(user_id, MAX_ANALYSIS_TRANSACTIONS)
            .await?;

        if transactions.is_empty() {
            info!(%request_id, user_id, "No transactions found");
            return Err(AdvisoryError::NoDataFound(user_id.to_string()));
        }

        debug!(%request_id, count = transactions.len(), "Transactions fetched");
        Ok(transactions)
    }

    /// Run the full analysis for one user.
    pub async fn analyze(&self, user_id: &str) -> Result<TaxAnalysis> {
        let request_id = Uuid::new_v4();
        let start = Instant::now();

        info!(%request_id, user_id, "Starting tax analysis");

        // ───── FETCH ─────
        let transactions = self.fetch(request_id, user_id).await?;

        // ───── EXTRACT ─────
        let facts = self.extractor.extract(&transactions).await?;

        // ───── COMPUTE ─────
        let old = assess_old_regime(facts.total_income, facts.deduction_80c, facts.deduction_80d);
        let new = assess_new_regime(facts.total_income);
        let comparison = TaxComparison::from_results(&old, &new);

        info!(
            %request_id,
            old_regime_tax = comparison.old_regime_tax,
            new_regime_tax = comparison.new_regime_tax,
            recommendation = %comparison.recommendation,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tax analysis complete"
        );

        // ───── COMPOSE ─────
        Ok(TaxAnalysis {
            analysis: facts.into(),
            tax_comparison: comparison,
        })
    }

    /// Estimate savings from the same recent history. Nothing is persisted.
    pub async fn analyze_savings(&self, user_id: &str) -> Result<SavingsInsights> {
        let request_id = Uuid::new_v4();

        info!(%request_id, user_id, "Starting savings analysis");

        let transactions = self.fetch(request_id, user_id).await?;
        let reply = self
            .extractor
            .complete(&build_savings_prompt(&transactions))
            .await?;
        let insights = parse_savings(&reply)?;

        info!(
            %request_id,
            current_savings = insights.current_savings,
            potential_savings = insights.potential_savings,
            wasteful_spends = insights.wasteful_spends.len(),
            "Savings analysis complete"
        );

        Ok(insights)
    }
}
