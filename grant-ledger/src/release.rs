//! Fund-release workflow
//!
//! For each requested expenditure, in the order given:
//!
//! 1. skip it (with a warning) if it is not in the expenditure index
//! 2. reject the whole release if it is already `Approved`
//! 3. settle `fund` from the payer to the expenditure's spender
//! 4. mark it `Approved`
//! 5. create one `REM-<n>` reimbursement pointing back at it
//!
//! Everything is staged in the caller's transaction, so a failure on any
//! expenditure leaves the whole batch unreleased.

use crate::{
    expenditures::{get_expenditure, put_expenditure},
    index::{self, IndexKind},
    reimbursements::create_reimbursement,
    settlement,
    transaction::Transaction,
    types::{
        ActorId, ExpenditureId, ExpenditureStatus, Reimbursement, ReimbursementId,
        TransactionKind, REIMBURSEMENT_PREFIX, REIMBURSEMENT_SEQUENCE_BASE,
    },
    Error, Result,
};
use chrono::{DateTime, Utc};

/// Release funds from `payer` against each listed expenditure
///
/// Returns the reimbursements created, in processing order.
pub fn release_fund(
    tx: &mut Transaction<'_>,
    payer: &ActorId,
    expenditure_ids: &[ExpenditureId],
    date: DateTime<Utc>,
    strict_indices: bool,
) -> Result<Vec<Reimbursement>> {
    let mut released = Vec::with_capacity(expenditure_ids.len());

    for expenditure_id in expenditure_ids {
        if !index::contains(tx, IndexKind::Expenditure, expenditure_id.as_str(), strict_indices)? {
            tracing::warn!(expenditure_id = %expenditure_id, "Unknown expenditure skipped");
            continue;
        }

        let mut expenditure = get_expenditure(tx, expenditure_id)?;
        if expenditure.status == ExpenditureStatus::Approved {
            return Err(Error::AlreadyReleased(expenditure_id.to_string()));
        }

        settlement::transfer(
            tx,
            payer,
            &expenditure.from_actor,
            expenditure.amount,
            TransactionKind::Fund,
        )?;

        expenditure.status = ExpenditureStatus::Approved;
        put_expenditure(tx, &expenditure)?;

        let reimbursement_id = index::next_sequence_id(
            tx,
            IndexKind::Reimbursement,
            REIMBURSEMENT_PREFIX,
            REIMBURSEMENT_SEQUENCE_BASE,
            strict_indices,
        )?;

        let reimbursement = create_reimbursement(
            tx,
            Reimbursement {
                reimbursement_id: ReimbursementId::new(reimbursement_id),
                amount: expenditure.amount,
                from_actor: payer.clone(),
                to_actor: expenditure.from_actor.clone(),
                date,
                expenditure_id: expenditure.expenditure_id.clone(),
            },
            strict_indices,
        )?;

        released.push(reimbursement);
    }

    Ok(released)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::{create_actor, get_actor};
    use crate::expenditures::{record_spend, SpendRequest};
    use crate::storage::MemoryStore;
    use crate::types::Balances;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap()
    }

    fn seed(tx: &mut Transaction<'_>) {
        create_actor(
            tx,
            &ActorId::new("101"),
            "Grantor",
            Balances {
                committed: Decimal::new(125000, 0),
                ..Default::default()
            },
            false,
        )
        .unwrap();
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

    fn spend(tx: &mut Transaction<'_>, amount: i64) -> ExpenditureId {
        let (exp, _) = record_spend(
            tx,
            SpendRequest {
                from_actor: &ActorId::new("102"),
                to_actor: &ActorId::new("104"),
                amount: Decimal::new(amount, 0),
                expenditure_type: "Equipment",
            },
            now(),
            Decimal::new(6000, 0),
            false,
        )
        .unwrap();
        exp.expenditure_id
    }

    #[test]
    fn test_release_approves_and_reimburses() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store);
        seed(&mut tx);
        let exp_id = spend(&mut tx, 8000);

        let released = release_fund(&mut tx, &ActorId::new("101"), &[exp_id.clone()], now(), false)
            .unwrap();

        assert_eq!(released.len(), 1);
        assert_eq!(released[0].reimbursement_id.as_str(), "REM-301");
        assert_eq!(released[0].expenditure_id, exp_id);
        assert_eq!(released[0].amount, Decimal::new(8000, 0));
        assert_eq!(released[0].to_actor.as_str(), "102");

        assert_eq!(
            get_expenditure(&tx, &exp_id).unwrap().status,
            ExpenditureStatus::Approved
        );
        assert_eq!(
            get_actor(&tx, &ActorId::new("101")).unwrap().reimbursed,
            Decimal::new(8000, 0)
        );
        // Spend credited the supplier, release credited the grantee
        assert_eq!(
            get_actor(&tx, &ActorId::new("102")).unwrap().received,
            Decimal::new(8000, 0)
        );
    }

    #[test]
    fn test_unknown_ids_skipped() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store);
        seed(&mut tx);
        let exp_id = spend(&mut tx, 7000);

        let released = release_fund(
            &mut tx,
            &ActorId::new("101"),
            &[ExpenditureId::new("EXP-999"), exp_id],
            now(),
            false,
        )
        .unwrap();

        assert_eq!(released.len(), 1);
    }

    #[test]
    fn test_second_release_rejected() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store);
        seed(&mut tx);
        let exp_id = spend(&mut tx, 7000);

        release_fund(&mut tx, &ActorId::new("101"), &[exp_id.clone()], now(), false).unwrap();
        let result = release_fund(&mut tx, &ActorId::new("101"), &[exp_id], now(), false);
        assert!(matches!(result, Err(Error::AlreadyReleased(_))));
    }

    #[test]
    fn test_auto_approved_spend_cannot_be_released() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store);
        seed(&mut tx);
        let exp_id = spend(&mut tx, 500);

        let result = release_fund(&mut tx, &ActorId::new("101"), &[exp_id], now(), false);
        assert!(matches!(result, Err(Error::AlreadyReleased(_))));
    }

    #[test]
    fn test_payer_without_commitment() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store);
        seed(&mut tx);
        let exp_id = spend(&mut tx, 7000);

        let result = release_fund(&mut tx, &ActorId::new("104"), &[exp_id], now(), false);
        assert!(matches!(result, Err(Error::InsufficientFunds(_))));
    }
}
