//! Read-side projections over the indices
//!
//! Every query walks one index in insertion order and hydrates each record.
//! An indexed id whose record is gone fails with [`crate::Error::NotFound`].

use crate::{
    actors::get_actor,
    expenditures::get_expenditure,
    index::{self, IndexKind},
    reimbursements::get_reimbursement,
    transaction::Transaction,
    types::{Actor, ActorId, Expenditure, ExpenditureId, Reimbursement, ReimbursementId},
    Result,
};
use chrono::NaiveDate;

/// Every indexed expenditure
pub fn all_expenditures(tx: &Transaction<'_>, strict_indices: bool) -> Result<Vec<Expenditure>> {
    index::load(tx, IndexKind::Expenditure, strict_indices)?
        .into_iter()
        .map(|id| get_expenditure(tx, &ExpenditureId::new(id)))
        .collect()
}

/// Indexed expenditures still awaiting release
pub fn pending_expenditures(
    tx: &Transaction<'_>,
    strict_indices: bool,
) -> Result<Vec<Expenditure>> {
    Ok(all_expenditures(tx, strict_indices)?
        .into_iter()
        .filter(Expenditure::is_pending)
        .collect())
}

/// Indexed expenditures dated strictly after `threshold` (calendar date)
pub fn expenditures_after(
    tx: &Transaction<'_>,
    threshold: NaiveDate,
    strict_indices: bool,
) -> Result<Vec<Expenditure>> {
    Ok(all_expenditures(tx, strict_indices)?
        .into_iter()
        .filter(|exp| exp.is_after(threshold))
        .collect())
}

/// Every indexed reimbursement
pub fn all_reimbursements(
    tx: &Transaction<'_>,
    strict_indices: bool,
) -> Result<Vec<Reimbursement>> {
    index::load(tx, IndexKind::Reimbursement, strict_indices)?
        .into_iter()
        .map(|id| get_reimbursement(tx, &ReimbursementId::new(id)))
        .collect()
}

/// Every indexed actor with its balances
pub fn wallet(tx: &Transaction<'_>, strict_indices: bool) -> Result<Vec<Actor>> {
    index::load(tx, IndexKind::Actor, strict_indices)?
        .into_iter()
        .map(|id| get_actor(tx, &ActorId::new(id)))
        .collect()
}
