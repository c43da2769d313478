//! Regime calculators
//!
//! Pure progressive-band tax computations for the old and new regimes.
//! Both functions are total: negative inputs are clamped to zero and the
//! result is never negative.

use crate::models::{Regime, RegimeResult};

/// A progressive band: income up to `upper` is taxed at `rate_pct` over the
/// previous band's upper bound, on top of the fixed `base` amount.
#[derive(Debug, Clone, Copy)]
struct TaxBand {
    upper: f64,
    rate_pct: f64,
    base: f64,
}

const fn band(upper: f64, rate_pct: f64, base: f64) -> TaxBand {
    TaxBand {
        upper,
        rate_pct,
        base,
    }
}

pub const NEW_REGIME_STANDARD_DEDUCTION: f64 = 75_000.0;
pub const OLD_REGIME_STANDARD_DEDUCTION: f64 = 50_000.0;
pub const SECTION_80C_CAP: f64 = 150_000.0;

const NEW_REGIME_BANDS: &[TaxBand] = &[
    band(400_000.0, 0.0, 0.0),
    band(800_000.0, 5.0, 0.0),
    band(1_200_000.0, 10.0, 20_000.0),
    band(1_600_000.0, 15.0, 60_000.0),
    band(2_000_000.0, 20.0, 120_000.0),
    band(2_400_000.0, 25.0, 200_000.0),
    band(f64::INFINITY, 30.0, 300_000.0),
];

const OLD_REGIME_BANDS: &[TaxBand] = &[
    band(250_000.0, 0.0, 0.0),
    band(500_000.0, 5.0, 0.0),
    band(1_000_000.0, 20.0, 12_500.0),
    band(f64::INFINITY, 30.0, 112_500.0),
];

fn clamp(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}

/// Apply a band table to an already-reduced taxable amount.
fn apply_bands(bands: &[TaxBand], taxable: f64) -> f64 {
    let mut lower = 0.0;
    for b in bands {
        if taxable <= b.upper {
            return b.base + (taxable - lower) * b.rate_pct / 100.0;
        }
        lower = b.upper;
    }
    0.0
}

pub fn new_regime_taxable(income: f64) -> f64 {
    clamp(clamp(income) - NEW_REGIME_STANDARD_DEDUCTION)
}

pub fn old_regime_taxable(income: f64, ded_80c: f64, ded_80d: f64) -> f64 {
    let capped_80c = clamp(ded_80c).min(SECTION_80C_CAP);
    clamp(clamp(income) - OLD_REGIME_STANDARD_DEDUCTION - capped_80c - clamp(ded_80d))
}

/// Tax owed under the new regime.
pub fn new_regime(income: f64) -> f64 {
    apply_bands(NEW_REGIME_BANDS, new_regime_taxable(income))
}

/// Tax owed under the old regime. The 80C deduction is capped, 80D is not.
pub fn old_regime(income: f64, ded_80c: f64, ded_80d: f64) -> f64 {
    apply_bands(OLD_REGIME_BANDS, old_regime_taxable(income, ded_80c, ded_80d))
}

/// Whole-currency truncation shared by both regimes so comparisons stay fair.
pub fn to_currency(amount: f64) -> i64 {
    amount.trunc() as i64
}

pub fn assess_new_regime(income: f64) -> RegimeResult {
    RegimeResult {
        regime: Regime::New,
        taxable_income: to_currency(new_regime_taxable(income)),
        tax_owed: to_currency(new_regime(income)),
    }
}

pub fn assess_old_regime(income: f64, ded_80c: f64, ded_80d: f64) -> RegimeResult {
    RegimeResult {
        regime: Regime::Old,
        taxable_income: to_currency(old_regime_taxable(income, ded_80c, ded_80d)),
        tax_owed: to_currency(old_regime(income, ded_80c, ded_80d)),
    }
}
