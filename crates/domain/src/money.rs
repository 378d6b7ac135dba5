//! Monetary amounts.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// Supported currencies. There is no conversion between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Ron,
    Eur,
    Usd,
    Gbp,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Ron => "RON",
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RON" => Ok(Currency::Ron),
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            _ => Err(MoneyError::UnsupportedCurrency(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Currency mismatch: {left} and {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    #[error("Result would be negative: {minuend} - {subtrahend}")]
    NegativeResult { minuend: Decimal, subtrahend: Decimal },

    #[error("Percentage must be between 0 and 100, got {0}")]
    InvalidPercentage(Decimal),

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

impl MoneyError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidCommand
    }
}

/// Non-negative amount in a single currency.
///
/// Every operation returns a new value. Operations that scale an amount
/// round to two decimals, midpoint away from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::NegativeAmount(amount));
        }
        Ok(Self { amount, currency })
    }

    /// Amount in the default currency (RON).
    pub fn ron(amount: Decimal) -> Result<Self, MoneyError> {
        Self::new(amount, Currency::Ron)
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Self {
            amount: self.amount + other.amount,
            currency: self.currency,
        })
    }

    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        if other.amount > self.amount {
            return Err(MoneyError::NegativeResult {
                minuend: self.amount,
                subtrahend: other.amount,
            });
        }
        Ok(Self {
            amount: self.amount - other.amount,
            currency: self.currency,
        })
    }

    /// Subtracts, flooring at zero instead of failing.
    pub fn saturating_subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Self {
            amount: (self.amount - other.amount).max(Decimal::ZERO),
            currency: self.currency,
        })
    }

    pub fn multiply(&self, factor: Decimal) -> Result<Money, MoneyError> {
        if factor.is_sign_negative() && !factor.is_zero() {
            return Err(MoneyError::NegativeAmount(factor));
        }
        Ok(Self {
            amount: round(self.amount * factor),
            currency: self.currency,
        })
    }

    /// Line total for `quantity` units at this unit price.
    pub fn times(&self, quantity: u32) -> Money {
        Self {
            amount: round(self.amount * Decimal::from(quantity)),
            currency: self.currency,
        }
    }

    /// `percent` of this amount, with `percent` in `[0, 100]`.
    pub fn percentage(&self, percent: Decimal) -> Result<Money, MoneyError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(MoneyError::InvalidPercentage(percent));
        }
        Ok(Self {
            amount: round(self.amount * percent / Decimal::ONE_HUNDRED),
            currency: self.currency,
        })
    }

    /// Orders two amounts of the same currency.
    pub fn try_cmp(&self, other: &Money) -> Result<Ordering, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// Sums `amounts`, starting from zero in `currency`.
    pub fn sum<'a>(
        currency: Currency,
        amounts: impl IntoIterator<Item = &'a Money>,
    ) -> Result<Money, MoneyError> {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.add(m))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

fn round(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
