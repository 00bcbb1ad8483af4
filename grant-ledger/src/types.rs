//! Core types for the grant ledger
//!
//! All records are stored as flat JSON objects keyed by their identifier.
//! Money is held as [`Decimal`] and written as a numeric string, so any
//! fractional precision round-trips exactly.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Prefix of generated expenditure identifiers
pub const EXPENDITURE_PREFIX: &str = "EXP";

/// First sequence number handed out for expenditures
pub const EXPENDITURE_SEQUENCE_BASE: u64 = 201;

/// Prefix of generated reimbursement identifiers
pub const REIMBURSEMENT_PREFIX: &str = "REM";

/// First sequence number handed out for reimbursements
pub const REIMBURSEMENT_SEQUENCE_BASE: u64 = 301;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create new identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get as string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

string_id!(
    /// Actor identifier (grantor, grantee, sub-grantee, supplier)
    ActorId
);
string_id!(
    /// Expenditure identifier (`EXP-<sequence>` when generated)
    ExpenditureId
);
string_id!(
    /// Reimbursement identifier (`REM-<sequence>` when generated)
    ReimbursementId
);

/// Participant in the fund-flow graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique, immutable identifier
    #[serde(rename = "actorid")]
    pub actor_id: ActorId,

    /// Display name, lowercased at creation
    #[serde(rename = "actorname")]
    pub actor_name: String,

    /// Funds committed by a grantor
    pub committed: Decimal,

    /// Portion of `committed` already released
    pub reimbursed: Decimal,

    /// Funds awarded to a grantee
    pub awarded: Decimal,

    /// Portion of `awarded` already spent
    pub spent: Decimal,

    /// Funds received from spends or reimbursements
    pub received: Decimal,

    /// Funds delegated to sub-grantees
    pub delegated: Decimal,
}

impl Actor {
    /// Amount still spendable against the award
    pub fn available_award(&self) -> Decimal {
        self.awarded - self.spent
    }

    /// Amount still releasable against the commitment
    pub fn available_commitment(&self) -> Decimal {
        self.committed - self.reimbursed
    }
}

/// The six balance fields supplied when registering an actor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balances {
    /// Committed
    pub committed: Decimal,
    /// Reimbursed
    pub reimbursed: Decimal,
    /// Awarded
    pub awarded: Decimal,
    /// Spent
    pub spent: Decimal,
    /// Received
    pub received: Decimal,
    /// Delegated
    pub delegated: Decimal,
}

/// Approval status of an expenditure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenditureStatus {
    /// Above the approval threshold, awaiting fund release
    Pending,
    /// Released, or below the threshold at creation
    #[serde(alias = "Auto")]
    Approved,
}

impl ExpenditureStatus {
    /// Status name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenditureStatus::Pending => "Pending",
            ExpenditureStatus::Approved => "Approved",
        }
    }
}

impl FromStr for ExpenditureStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ExpenditureStatus::Pending),
            "approved" | "auto" => Ok(ExpenditureStatus::Approved),
            other => Err(Error::InvalidArgument(format!(
                "unknown expenditure status {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for ExpenditureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recorded spend event between two actors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expenditure {
    /// Unique identifier
    #[serde(rename = "expenditureid")]
    pub expenditure_id: ExpenditureId,

    /// Positive amount
    pub amount: Decimal,

    /// When the spend was recorded
    pub date: DateTime<Utc>,

    /// Free-text category
    #[serde(rename = "type")]
    pub expenditure_type: String,

    /// Approval status
    pub status: ExpenditureStatus,

    /// Spender
    #[serde(rename = "fromuser")]
    pub from_actor: ActorId,

    /// Payee
    #[serde(rename = "touser")]
    pub to_actor: ActorId,
}

impl Expenditure {
    /// Whether the expenditure still awaits fund release
    pub fn is_pending(&self) -> bool {
        self.status == ExpenditureStatus::Pending
    }

    /// Whether the expenditure was recorded strictly after `threshold` (calendar date)
    pub fn is_after(&self, threshold: NaiveDate) -> bool {
        self.date.date_naive() > threshold
    }
}

/// Funds released against one expenditure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reimbursement {
    /// Unique identifier
    #[serde(rename = "reimbursementid")]
    pub reimbursement_id: ReimbursementId,

    /// Released amount
    pub amount: Decimal,

    /// Funder
    #[serde(rename = "fromuser")]
    pub from_actor: ActorId,

    /// Beneficiary (the expenditure's spender)
    #[serde(rename = "touser")]
    pub to_actor: ActorId,

    /// When the release happened
    pub date: DateTime<Utc>,

    /// Back-reference to the released expenditure
    #[serde(rename = "expenditureid")]
    pub expenditure_id: ExpenditureId,
}

/// Settlement branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// A spends against its award, B receives
    Spend,
    /// A releases against its commitment, B receives
    Fund,
}

impl TransactionKind {
    /// Kind name as used by callers
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Spend => "spend",
            TransactionKind::Fund => "fund",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spend" => Ok(TransactionKind::Spend),
            "fund" => Ok(TransactionKind::Fund),
            other => Err(Error::UnknownTransactionKind(other.to_string())),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a non-negative monetary amount
pub fn parse_amount(field: &str, raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    let amount = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| Error::InvalidAmount(format!("{} must be a numeric string, got {:?}", field, raw)))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::InvalidAmount(format!(
            "{} must not be negative, got {}",
            field, amount
        )));
    }

    Ok(amount)
}

/// Parse a strictly positive monetary amount
pub fn parse_positive_amount(field: &str, raw: &str) -> Result<Decimal> {
    let amount = parse_amount(field, raw)?;
    if amount.is_zero() {
        return Err(Error::InvalidAmount(format!("{} must be positive", field)));
    }
    Ok(amount)
}

/// Parse a calendar date (`YYYY-MM-DD`)
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidArgument(format!("invalid date {:?}: {}", raw, e)))
}

/// Parse a timestamp: RFC 3339, or a bare date at midnight UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = parse_date(raw)?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

/// Reject empty identifiers and names
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} must be a non-empty string", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("committed", "125000").unwrap(), Decimal::new(125000, 0));
        assert_eq!(parse_amount("spent", " 10.25 ").unwrap(), Decimal::new(1025, 2));
        assert_eq!(parse_amount("spent", "1e3").unwrap(), Decimal::new(1000, 0));
        assert!(matches!(parse_amount("spent", "ten"), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount("spent", ""), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount("spent", "-1"), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_parse_positive_amount() {
        assert!(matches!(
            parse_positive_amount("amount", "0"),
            Err(Error::InvalidAmount(_))
        ));
        assert_eq!(parse_positive_amount("amount", "0.01").unwrap(), Decimal::new(1, 2));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Pending".parse::<ExpenditureStatus>().unwrap(), ExpenditureStatus::Pending);
        assert_eq!("approved".parse::<ExpenditureStatus>().unwrap(), ExpenditureStatus::Approved);
        assert_eq!("Auto".parse::<ExpenditureStatus>().unwrap(), ExpenditureStatus::Approved);
        assert!("Rejected".parse::<ExpenditureStatus>().is_err());
    }

    #[test]
    fn test_legacy_auto_status_deserializes_as_approved() {
        let status: ExpenditureStatus = serde_json::from_str("\"Auto\"").unwrap();
        assert_eq!(status, ExpenditureStatus::Approved);
    }

    #[test]
    fn test_transaction_kind_from_str() {
        assert_eq!("spend".parse::<TransactionKind>().unwrap(), TransactionKind::Spend);
        assert_eq!("fund".parse::<TransactionKind>().unwrap(), TransactionKind::Fund);
        assert!(matches!(
            "refund".parse::<TransactionKind>(),
            Err(Error::UnknownTransactionKind(kind)) if kind == "refund"
        ));
    }

    #[test]
    fn test_actor_wire_format() {
        let actor = Actor {
            actor_id: ActorId::new("101"),
            actor_name: "ppm foundation".to_string(),
            committed: Decimal::new(12500050, 2),
            reimbursed: Decimal::ZERO,
            awarded: Decimal::ZERO,
            spent: Decimal::ZERO,
            received: Decimal::ZERO,
            delegated: Decimal::ZERO,
        };

        let value = serde_json::to_value(&actor).unwrap();
        assert_eq!(value["actorid"], "101");
        assert_eq!(value["committed"], "125000.50");

        let back: Actor = serde_json::from_value(value).unwrap();
        assert_eq!(back, actor);
    }

    #[test]
    fn test_expenditure_is_after_uses_calendar_date() {
        let exp = Expenditure {
            expenditure_id: ExpenditureId::new("EXP-201"),
            amount: Decimal::new(100, 0),
            date: Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 0).unwrap(),
            expenditure_type: "Travel".to_string(),
            status: ExpenditureStatus::Approved,
            from_actor: ActorId::new("102"),
            to_actor: ActorId::new("104"),
        };

        assert!(exp.is_after(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()));
        assert!(!exp.is_after(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()));
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-03-10T12:00:00Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());

        let midnight = parse_timestamp("2024-03-10").unwrap();
        assert_eq!(midnight, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());

        assert!(matches!(parse_timestamp("yesterday"), Err(Error::InvalidArgument(_))));
    }
}
