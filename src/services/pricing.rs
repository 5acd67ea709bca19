//! pricing.rs
//!
//! Pure price computation for a booking: subtotal, tax, promo discount, total.
//!
//! All amounts are whole currency units. Fractional results of percentage
//! math are rounded half away from zero with integer arithmetic, so the
//! same inputs always produce the same breakdown.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// 5%, in basis points.
pub const DEFAULT_TAX_RATE_BPS: i64 = 500;

const BPS_DENOMINATOR: i64 = 10_000;
const PERCENT_DENOMINATOR: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromoKind {
    Percentage,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoRule {
    pub kind: PromoKind,
    pub value: i64,
    pub description: String,
}

/// Immutable code → rule table. Codes are stored upper-cased so lookups are
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromoTable {
    rules: HashMap<String, PromoRule>,
}

impl PromoTable {
    pub fn new<I, K>(rules: I) -> Self
    where
        I: IntoIterator<Item = (K, PromoRule)>,
        K: AsRef<str>,
    {
        Self {
            rules: rules
                .into_iter()
                .map(|(code, rule)| (normalize_code(code.as_ref()), rule))
                .collect(),
        }
    }

    /// The codes shipped with the service.
    pub fn builtin() -> Self {
        Self::new([
            (
                "SAVE10",
                PromoRule {
                    kind: PromoKind::Percentage,
                    value: 10,
                    description: "10% off".to_string(),
                },
            ),
            (
                "FLAT100",
                PromoRule {
                    kind: PromoKind::Flat,
                    value: 100,
                    description: "₹100 off".to_string(),
                },
            ),
        ])
    }

    pub fn lookup(&self, code: &str) -> Option<&PromoRule> {
        self.rules.get(&normalize_code(code))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub discount: i64,
    pub taxes: i64,
    pub total: i64,
}

/// What happened to the promo code the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoOutcome {
    NotProvided,
    Applied { code: String, description: String },
    /// Unknown code. Discount is zero; the caller decides whether to proceed.
    Invalid { code: String },
}

impl PromoOutcome {
    pub fn applied_code(&self) -> Option<&str> {
        match self {
            PromoOutcome::Applied { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn invalid_code(&self) -> Option<&str> {
        match self {
            PromoOutcome::Invalid { code } => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub breakdown: PriceBreakdown,
    pub promo: PromoOutcome,
}

/// Discount a promo yields on a bare subtotal (no tax, no clamping).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoDiscount {
    pub discount: i64,
    pub description: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("amount must not be negative: {0}")]
    NegativeAmount(i64),

    #[error("price computation overflowed")]
    Overflow,
}

#[derive(Debug, Clone)]
pub struct PricingCalculator {
    promos: Arc<PromoTable>,
    tax_rate_bps: i64,
}

impl PricingCalculator {
    pub fn new(promos: PromoTable, tax_rate_bps: i64) -> Self {
        Self {
            promos: Arc::new(promos),
            tax_rate_bps,
        }
    }

    pub fn price(
        &self,
        unit_price: i64,
        quantity: u32,
        promo_code: Option<&str>,
    ) -> Result<Quote, PricingError> {
        if unit_price < 0 {
            return Err(PricingError::NegativeAmount(unit_price));
        }

        let subtotal = unit_price
            .checked_mul(i64::from(quantity))
            .ok_or(PricingError::Overflow)?;
        let taxes = scale_rounded(subtotal, self.tax_rate_bps, BPS_DENOMINATOR)?;
        let ceiling = subtotal.checked_add(taxes).ok_or(PricingError::Overflow)?;

        let code = promo_code.map(normalize_code).filter(|c| !c.is_empty());
        let (discount, promo) = match code {
            None => (0, PromoOutcome::NotProvided),
            Some(code) => match self.promos.lookup(&code) {
                Some(rule) => (
                    rule_discount(rule, subtotal)?,
                    PromoOutcome::Applied {
                        code,
                        description: rule.description.clone(),
                    },
                ),
                None => (0, PromoOutcome::Invalid { code }),
            },
        };
        let discount = discount.clamp(0, ceiling);

        Ok(Quote {
            breakdown: PriceBreakdown {
                subtotal,
                discount,
                taxes,
                total: ceiling - discount,
            },
            promo,
        })
    }

    /// Discount for `code` on `subtotal`, or `None` when the code is unknown.
    pub fn promo_discount(
        &self,
        subtotal: i64,
        code: &str,
    ) -> Result<Option<PromoDiscount>, PricingError> {
        if subtotal < 0 {
            return Err(PricingError::NegativeAmount(subtotal));
        }
        let Some(rule) = self.promos.lookup(code) else {
            return Ok(None);
        };
        Ok(Some(PromoDiscount {
            discount: rule_discount(rule, subtotal)?,
            description: rule.description.clone(),
        }))
    }
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new(PromoTable::builtin(), DEFAULT_TAX_RATE_BPS)
    }
}

fn rule_discount(rule: &PromoRule, subtotal: i64) -> Result<i64, PricingError> {
    match rule.kind {
        PromoKind::Percentage => scale_rounded(subtotal, rule.value, PERCENT_DENOMINATOR),
        PromoKind::Flat => Ok(rule.value),
    }
}

/// `round(amount * numerator / denominator)`, half away from zero.
fn scale_rounded(amount: i64, numerator: i64, denominator: i64) -> Result<i64, PricingError> {
    let scaled = amount.checked_mul(numerator).ok_or(PricingError::Overflow)?;
    let half = denominator / 2;
    let biased = if scaled >= 0 {
        scaled.checked_add(half)
    } else {
        scaled.checked_sub(half)
    }
    .ok_or(PricingError::Overflow)?;
    Ok(biased / denominator)
}
