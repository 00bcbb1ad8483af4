//! Expenditure registry

use crate::{
    actors::get_actor,
    index::{self, IndexKind},
    settlement::{self, Settlement},
    transaction::Transaction,
    types::{
        require_non_empty, ActorId, Expenditure, ExpenditureId, ExpenditureStatus,
        TransactionKind, EXPENDITURE_PREFIX, EXPENDITURE_SEQUENCE_BASE,
    },
    Error, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Store a new expenditure and append it to the expenditure index
///
/// Both actors must already exist.
pub fn create_expenditure(
    tx: &mut Transaction<'_>,
    expenditure: Expenditure,
    strict_indices: bool,
) -> Result<Expenditure> {
    let id = expenditure.expenditure_id.as_str();
    require_non_empty("expenditure id", id)?;
    index::ensure_not_reserved("expenditure id", id)?;

    if expenditure.amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "expenditure amount must be positive, got {}",
            expenditure.amount
        )));
    }

    if tx.exists(id)? {
        return Err(Error::DuplicateId(id.to_string()));
    }

    get_actor(tx, &expenditure.from_actor)?;
    get_actor(tx, &expenditure.to_actor)?;

    tx.put(id, &expenditure)?;
    index::append(tx, IndexKind::Expenditure, id, strict_indices)?;

    Ok(expenditure)
}

/// Load an expenditure
pub fn get_expenditure(tx: &Transaction<'_>, expenditure_id: &ExpenditureId) -> Result<Expenditure> {
    tx.get(expenditure_id.as_str())?
        .ok_or_else(|| Error::NotFound(format!("expenditure {}", expenditure_id)))
}

/// Persist an updated expenditure record
pub(crate) fn put_expenditure(tx: &mut Transaction<'_>, expenditure: &Expenditure) -> Result<()> {
    tx.put(expenditure.expenditure_id.as_str(), expenditure)
}

/// Status assigned to a new spend
pub fn classify(amount: Decimal, approval_threshold: Decimal) -> ExpenditureStatus {
    if amount > approval_threshold {
        ExpenditureStatus::Pending
    } else {
        ExpenditureStatus::Approved
    }
}

/// Parameters of a spend
#[derive(Debug, Clone)]
pub struct SpendRequest<'a> {
    /// Spender
    pub from_actor: &'a ActorId,
    /// Payee
    pub to_actor: &'a ActorId,
    /// Positive amount
    pub amount: Decimal,
    /// Free-text category
    pub expenditure_type: &'a str,
}

/// Record a spend: new `EXP-<n>` expenditure plus a `spend` settlement
pub fn record_spend(
    tx: &mut Transaction<'_>,
    request: SpendRequest<'_>,
    date: DateTime<Utc>,
    approval_threshold: Decimal,
    strict_indices: bool,
) -> Result<(Expenditure, Settlement)> {
    let expenditure_id = index::next_sequence_id(
        tx,
        IndexKind::Expenditure,
        EXPENDITURE_PREFIX,
        EXPENDITURE_SEQUENCE_BASE,
        strict_indices,
    )?;

    let expenditure = create_expenditure(
        tx,
        Expenditure {
            expenditure_id: ExpenditureId::new(expenditure_id),
            amount: request.amount,
            date,
            expenditure_type: request.expenditure_type.to_string(),
            status: classify(request.amount, approval_threshold),
            from_actor: request.from_actor.clone(),
            to_actor: request.to_actor.clone(),
        },
        strict_indices,
    )?;

    let settlement = settlement::transfer(
        tx,
        request.from_actor,
        request.to_actor,
        request.amount,
        TransactionKind::Spend,
    )?;

    Ok((expenditure, settlement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::create_actor;
    use crate::storage::MemoryStore;
    use crate::types::Balances;
    use chrono::TimeZone;

    fn threshold() -> Decimal {
        Decimal::new(6000, 0)
    }

    fn seed(tx: &mut Transaction<'_>) {
        create_actor(
            tx,
            &ActorId::new("102"),
            "Grantee",
            Balances {
                awarded: Decimal::new(125000, 0),
                ..Default::default()
            },
            false,
        )
        .unwrap();
        create_actor(tx, &ActorId::new("104"), "Supplier", Balances::default(), false).unwrap();
    }

    fn sample(id: &str, amount: i64) -> Expenditure {
        Expenditure {
            expenditure_id: ExpenditureId::new(id),
            amount: Decimal::new(amount, 0),
            date: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
            expenditure_type: "Equipment".to_string(),
            status: ExpenditureStatus::Pending,
            from_actor: ActorId::new("102"),
            to_actor: ActorId::new("104"),
        }
    }

    #[test]
    fn test_classify_threshold() {
        assert_eq!(classify(Decimal::new(8000, 0), threshold()), ExpenditureStatus::Pending);
        assert_eq!(classify(Decimal::new(6000, 0), threshold()), ExpenditureStatus::Approved);
        assert_eq!(classify(Decimal::new(600001, 2), threshold()), ExpenditureStatus::Pending);
    }

    #[test]
    fn test_create_and_duplicate() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store);
        seed(&mut tx);

        let created = create_expenditure(&mut tx, sample("EXP-1", 100), false).unwrap();
        assert_eq!(get_expenditure(&tx, &created.expenditure_id).unwrap(), created);

        let result = create_expenditure(&mut tx, sample("EXP-1", 999), false);
        assert!(matches!(result, Err(Error::DuplicateId(_))));
        assert_eq!(
            get_expenditure(&tx, &ExpenditureId::new("EXP-1")).unwrap().amount,
            Decimal::new(100, 0)
        );
    }

    #[test]
    fn test_create_requires_known_actors() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store);
        seed(&mut tx);

        let mut exp = sample("EXP-1", 100);
        exp.to_actor = ActorId::new("999");
        assert!(matches!(
            create_expenditure(&mut tx, exp, false),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_create_rejects_zero_amount() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store);
        seed(&mut tx);

        assert!(matches!(
            create_expenditure(&mut tx, sample("EXP-1", 0), false),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_record_spend_generates_sequential_ids() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store);
        seed(&mut tx);

        let from = ActorId::new("102");
        let to = ActorId::new("104");
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();

        let mut ids = Vec::new();
        for amount in [8000, 500] {
            let (exp, _) = record_spend(
                &mut tx,
                SpendRequest {
                    from_actor: &from,
                    to_actor: &to,
                    amount: Decimal::new(amount, 0),
                    expenditure_type: "Equipment",
                },
                date,
                threshold(),
                false,
            )
            .unwrap();
            ids.push((exp.expenditure_id.to_string(), exp.status));
        }

        assert_eq!(
            ids,
            vec![
                ("EXP-201".to_string(), ExpenditureStatus::Pending),
                ("EXP-202".to_string(), ExpenditureStatus::Approved),
            ]
        );
        assert_eq!(get_actor(&tx, &from).unwrap().spent, Decimal::new(8500, 0));
    }
}
