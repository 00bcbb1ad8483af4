//! Actor ledger
//!
//! Registration and lookup of fund-flow participants. Balances change only
//! through [`crate::settlement`].

use rust_decimal::Decimal;

use crate::{
    index::{self, IndexKind},
    transaction::Transaction,
    types::{require_non_empty, Actor, ActorId, Balances},
    Error, Result,
};

/// Register a new actor and append it to the actor index
pub fn create_actor(
    tx: &mut Transaction<'_>,
    actor_id: &ActorId,
    actor_name: &str,
    balances: Balances,
    strict_indices: bool,
) -> Result<Actor> {
    require_non_empty("actor id", actor_id.as_str())?;
    require_non_empty("actor name", actor_name)?;
    index::ensure_not_reserved("actor id", actor_id.as_str())?;

    check_balances(actor_id, &balances)?;

    if tx.exists(actor_id.as_str())? {
        return Err(Error::DuplicateId(actor_id.to_string()));
    }

    let actor = Actor {
        actor_id: actor_id.clone(),
        actor_name: actor_name.to_lowercase(),
        committed: balances.committed,
        reimbursed: balances.reimbursed,
        awarded: balances.awarded,
        spent: balances.spent,
        received: balances.received,
        delegated: balances.delegated,
    };

    tx.put(actor_id.as_str(), &actor)?;
    index::append(tx, IndexKind::Actor, actor_id.as_str(), strict_indices)?;

    Ok(actor)
}

/// Balances must be non-negative with `spent <= awarded` and `reimbursed <= committed`
fn check_balances(actor_id: &ActorId, balances: &Balances) -> Result<()> {
    let fields = [
        ("committed", balances.committed),
        ("reimbursed", balances.reimbursed),
        ("awarded", balances.awarded),
        ("spent", balances.spent),
        ("received", balances.received),
        ("delegated", balances.delegated),
    ];
    if let Some((field, value)) = fields.iter().find(|(_, value)| *value < Decimal::ZERO) {
        return Err(Error::InvalidAmount(format!(
            "{} of {} must not be negative, got {}",
            field, actor_id, value
        )));
    }

    if balances.spent > balances.awarded {
        return Err(Error::InvalidAmount(format!(
            "{} spent {} exceeds awarded {}",
            actor_id, balances.spent, balances.awarded
        )));
    }
    if balances.reimbursed > balances.committed {
        return Err(Error::InvalidAmount(format!(
            "{} reimbursed {} exceeds committed {}",
            actor_id, balances.reimbursed, balances.committed
        )));
    }

    Ok(())
}

/// Load an actor
pub fn get_actor(tx: &Transaction<'_>, actor_id: &ActorId) -> Result<Actor> {
    tx.get(actor_id.as_str())?
        .ok_or_else(|| Error::NotFound(format!("actor {}", actor_id)))
}

/// Persist an actor record
pub(crate) fn put_actor(tx: &mut Transaction<'_>, actor: &Actor) -> Result<()> {
    tx.put(actor.actor_id.as_str(), actor)
}
