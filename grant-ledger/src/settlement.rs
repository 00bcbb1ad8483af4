//! Settlement engine
//!
//! The single place money moves. One call loads two actors, checks the
//! balance invariant for the chosen [`TransactionKind`] and writes both back.
//!
//! | kind    | check                              | effect                                   |
//! |---------|------------------------------------|------------------------------------------|
//! | `spend` | `A.spent + amount <= A.awarded`    | `A.spent += amount`, `B.received += amount`      |
//! | `fund`  | `A.reimbursed + amount <= A.committed` | `A.reimbursed += amount`, `B.received += amount` |
//!
//! Writes go into the caller's [`Transaction`]; nothing is visible until the
//! surrounding operation commits.

use crate::{
    actors::{get_actor, put_actor},
    transaction::Transaction,
    types::{Actor, ActorId, TransactionKind},
    Error, Result,
};
use rust_decimal::Decimal;

/// Both sides of a completed settlement, as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Paying side after the transfer
    pub payer: Actor,
    /// Receiving side after the transfer
    pub receiver: Actor,
}

/// Move `amount` from `actor_a` to `actor_b`
pub fn transfer(
    tx: &mut Transaction<'_>,
    actor_a: &ActorId,
    actor_b: &ActorId,
    amount: Decimal,
    kind: TransactionKind,
) -> Result<Settlement> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "transfer amount must be positive, got {}",
            amount
        )));
    }

    let mut payer = get_actor(tx, actor_a)?;
    let mut receiver = get_actor(tx, actor_b)?;

    match kind {
        TransactionKind::Spend => {
            if payer.available_award() < amount {
                return Err(Error::InsufficientFunds(format!(
                    "{} has {} of award left, needs {}",
                    payer.actor_id,
                    payer.available_award(),
                    amount
                )));
            }
            payer.spent = checked_add(payer.spent, amount)?;
        }
        TransactionKind::Fund => {
            if payer.available_commitment() < amount {
                return Err(Error::InsufficientFunds(format!(
                    "{} has {} of commitment left, needs {}",
                    payer.actor_id,
                    payer.available_commitment(),
                    amount
                )));
            }
            payer.reimbursed = checked_add(payer.reimbursed, amount)?;
        }
    }

    // Self-transfer: both sides are the same record
    if actor_a == actor_b {
        receiver = payer.clone();
    }
    receiver.received = checked_add(receiver.received, amount)?;
    if actor_a == actor_b {
        payer = receiver.clone();
    }

    put_actor(tx, &payer)?;
    put_actor(tx, &receiver)?;

    tracing::debug!(
        payer = %payer.actor_id,
        receiver = %receiver.actor_id,
        amount = %amount,
        kind = %kind,
        "Settlement staged"
    );

    Ok(Settlement { payer, receiver })
}

fn checked_add(balance: Decimal, amount: Decimal) -> Result<Decimal> {
    balance
        .checked_add(amount)
        .ok_or_else(|| Error::InvalidAmount(format!("{} + {} overflows", balance, amount)))
}
