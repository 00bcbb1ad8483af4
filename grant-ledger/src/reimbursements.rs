//! Reimbursement registry

use crate::{
    index::{self, IndexKind},
    transaction::Transaction,
    types::{require_non_empty, Reimbursement, ReimbursementId},
    Error, Result,
};
use rust_decimal::Decimal;

/// Store a new reimbursement and append it to the reimbursement index
pub fn create_reimbursement(
    tx: &mut Transaction<'_>,
    reimbursement: Reimbursement,
    strict_indices: bool,
) -> Result<Reimbursement> {
    let id = reimbursement.reimbursement_id.as_str();
    require_non_empty("reimbursement id", id)?;
    index::ensure_not_reserved("reimbursement id", id)?;

    if reimbursement.amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "reimbursement amount must be positive, got {}",
            reimbursement.amount
        )));
    }

    if tx.exists(id)? {
        return Err(Error::DuplicateId(id.to_string()));
    }

    tx.put(id, &reimbursement)?;
    index::append(tx, IndexKind::Reimbursement, id, strict_indices)?;

    Ok(reimbursement)
}

/// Load a reimbursement
pub fn get_reimbursement(
    tx: &Transaction<'_>,
    reimbursement_id: &ReimbursementId,
) -> Result<Reimbursement> {
    tx.get(reimbursement_id.as_str())?
        .ok_or_else(|| Error::NotFound(format!("reimbursement {}", reimbursement_id)))
}
