//! Persistent domain records: pledges and processor-reported payments.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{PaymentError, Result};

/// Lifecycle status of a pledge, as far as the payment core is concerned.
///
/// The ordering is meaningful: a pledge only ever moves forward
/// (UNAUTHORIZED → AUTHORIZED → PAID) and never regresses from PAID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PledgeStatus {
    Unauthorized,
    Authorized,
    Paid,
}

impl PledgeStatus {
    /// Parse the status string stored in the database.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unauthorized" => Some(Self::Unauthorized),
            "authorized" => Some(Self::Authorized),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    /// Return a short identifier string suitable for storage in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Authorized => "authorized",
            Self::Paid => "paid",
        }
    }
}

/// A backer's monetary commitment to a project, as stored in the database.
///
/// The pledge lifecycle (creation, reward selection, backer identity) is
/// owned elsewhere; this core reads identity, amount and currency, and
/// writes `status`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Pledge {
    pub id: i64,
    pub project_slug: String,
    pub backer_id: Option<i64>,
    /// Decimal amount in major currency units, e.g. `"35.00"`.
    pub amount: String,
    pub currency: String,
    pub status: String,
    pub created_at: i64,
}

impl Pledge {
    /// The pledge amount expressed in minor currency units (cents).
    ///
    /// Currencies here have exactly two decimal places; an amount that is
    /// not exact to the cent is a data error, not something to round away.
    pub fn amount_minor_units(&self) -> Result<i64> {
        let amount: Decimal = self
            .amount
            .parse()
            .map_err(|_| PaymentError::Amount(self.amount.clone()))?;
        let minor = amount * Decimal::from(100);
        if minor != minor.trunc() {
            return Err(PaymentError::Amount(self.amount.clone()));
        }
        minor
            .to_i64()
            .ok_or_else(|| PaymentError::Amount(self.amount.clone()))
    }
}

/// A processor-reported payment state for one order, as stored in / read
/// from the database.  One row per `(order_id, pledge_id)`; every later
/// notification for the same order overwrites the processor fields.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub order_id: String,
    pub pledge_id: i64,
    pub amount: String,
    pub currency: String,
    /// Raw processor status code, e.g. `"5"` (authorized) or `"9"` (paid).
    pub status: String,
    /// Processor transaction identifier.
    pub payid: String,
    /// Payment method.
    pub pm: String,
    /// Acquirer acceptance code.
    pub acceptance: String,
    /// Masked card number.
    pub cardno: String,
    /// Card brand.
    pub brand: String,
    pub created_at: i64,
    pub updated_at: i64,
}
