//! Closed set of ledger operations
//!
//! Callers hand the ledger an [`Operation`] with string arguments, exactly as
//! they arrive from a host dispatcher; the ledger validates and parses them.
//! On the wire each operation is a JSON object tagged by `op`:
//!
//! ```json
//! {"op": "spend", "from_actor": "102", "to_actor": "104", "amount": "8000", "expenditure_type": "Equipment"}
//! ```

use crate::types::{Actor, Expenditure, Reimbursement};
use serde::{Deserialize, Serialize};

/// Operation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Reset the three index lists to empty
    Init,

    /// Seed the demo grantor, grantee, sub-grantee and supplier
    #[serde(rename = "setup")]
    SetUp,

    /// Register an actor
    CreateActor {
        /// Identifier
        actor_id: String,
        /// Name (stored lowercase)
        actor_name: String,
        /// Committed
        committed: String,
        /// Reimbursed
        reimbursed: String,
        /// Awarded
        awarded: String,
        /// Spent
        spent: String,
        /// Received
        received: String,
        /// Delegated
        delegated: String,
    },

    /// Look up an actor
    GetActor {
        /// Identifier
        actor_id: String,
    },

    /// Store an expenditure as given (no settlement)
    CreateExpenditure {
        /// Identifier
        expenditure_id: String,
        /// Positive amount
        amount: String,
        /// RFC 3339 timestamp or `YYYY-MM-DD`
        date: String,
        /// Free-text category
        expenditure_type: String,
        /// `Pending` or `Approved`
        status: String,
        /// Spender
        from_actor: String,
        /// Payee
        to_actor: String,
    },

    /// Look up an expenditure
    GetExpenditure {
        /// Identifier
        expenditure_id: String,
    },

    /// Record a spend and settle it
    Spend {
        /// Spender
        from_actor: String,
        /// Payee
        to_actor: String,
        /// Positive amount
        amount: String,
        /// Free-text category
        expenditure_type: String,
    },

    /// Store a reimbursement as given (no settlement)
    CreateReimbursement {
        /// Identifier
        reimbursement_id: String,
        /// Positive amount
        amount: String,
        /// Funder
        from_actor: String,
        /// Beneficiary
        to_actor: String,
        /// RFC 3339 timestamp or `YYYY-MM-DD`
        date: String,
        /// Released expenditure
        expenditure_id: String,
    },

    /// Look up a reimbursement
    GetReimbursement {
        /// Identifier
        reimbursement_id: String,
    },

    /// Settle directly between two actors
    Transfer {
        /// Paying side
        actor_a: String,
        /// Receiving side
        actor_b: String,
        /// Positive amount
        amount: String,
        /// `spend` or `fund`
        kind: String,
    },

    /// Release funds against a batch of expenditures
    ReleaseFund {
        /// Funder
        payer: String,
        /// Expenditures to release, processed in order
        expenditure_ids: Vec<String>,
    },

    /// Every expenditure, in index order
    AllExpenditures,

    /// Expenditures awaiting release
    PendingExpenditures,

    /// Expenditures dated after a calendar date
    ExpendituresAfter {
        /// `YYYY-MM-DD`
        date: String,
    },

    /// Every reimbursement, in index order
    AllReimbursements,

    /// Every actor with balances
    Wallet,

    /// Raw read by key
    Read {
        /// Store key
        key: String,
    },

    /// Raw write by key
    Write {
        /// Store key
        key: String,
        /// UTF-8 value
        value: String,
    },

    /// Delete a record and drop it from every index
    Delete {
        /// Store key
        key: String,
    },
}

impl Operation {
    /// Stable operation name (metrics label, log field)
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::SetUp => "setup",
            Operation::CreateActor { .. } => "create_actor",
            Operation::GetActor { .. } => "get_actor",
            Operation::CreateExpenditure { .. } => "create_expenditure",
            Operation::GetExpenditure { .. } => "get_expenditure",
            Operation::Spend { .. } => "spend",
            Operation::CreateReimbursement { .. } => "create_reimbursement",
            Operation::GetReimbursement { .. } => "get_reimbursement",
            Operation::Transfer { .. } => "transfer",
            Operation::ReleaseFund { .. } => "release_fund",
            Operation::AllExpenditures => "all_expenditures",
            Operation::PendingExpenditures => "pending_expenditures",
            Operation::ExpendituresAfter { .. } => "expenditures_after",
            Operation::AllReimbursements => "all_reimbursements",
            Operation::Wallet => "wallet",
            Operation::Read { .. } => "read",
            Operation::Write { .. } => "write",
            Operation::Delete { .. } => "delete",
        }
    }
}

/// Operation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "data", rename_all = "snake_case")]
pub enum Response {
    /// Mutation applied, nothing to return
    Done,
    /// One actor
    Actor(Actor),
    /// Several actors, in index order
    Actors(Vec<Actor>),
    /// One expenditure
    Expenditure(Expenditure),
    /// Several expenditures, in index order
    Expenditures(Vec<Expenditure>),
    /// One reimbursement
    Reimbursement(Reimbursement),
    /// Several reimbursements, in creation order
    Reimbursements(Vec<Reimbursement>),
    /// Raw value (lossy UTF-8), `None` when the key is absent
    Value(Option<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_wire_format() {
        let op: Operation = serde_json::from_str(
            r#"{"op":"spend","from_actor":"102","to_actor":"104","amount":"8000","expenditure_type":"Equipment"}"#,
        )
        .unwrap();

        assert_eq!(
            op,
            Operation::Spend {
                from_actor: "102".to_string(),
                to_actor: "104".to_string(),
                amount: "8000".to_string(),
                expenditure_type: "Equipment".to_string(),
            }
        );
        assert_eq!(op.name(), "spend");
    }

    #[test]
    fn test_unit_operations() {
        let op: Operation = serde_json::from_str(r#"{"op":"setup"}"#).unwrap();
        assert_eq!(op, Operation::SetUp);

        let op: Operation = serde_json::from_str(r#"{"op":"pending_expenditures"}"#).unwrap();
        assert_eq!(op, Operation::PendingExpenditures);
    }

    #[test]
    fn test_release_fund_wire_format() {
        let op: Operation = serde_json::from_str(
            r#"{"op":"release_fund","payer":"101","expenditure_ids":["EXP-201","EXP-202"]}"#,
        )
        .unwrap();
        assert_eq!(
            op,
            Operation::ReleaseFund {
                payer: "101".to_string(),
                expenditure_ids: vec!["EXP-201".to_string(), "EXP-202".to_string()],
            }
        );
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let result = serde_json::from_str::<Operation>(r#"{"op":"transfer_balance"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_response_wire_format() {
        let value = serde_json::to_value(Response::Value(Some("1".to_string()))).unwrap();
        assert_eq!(value, serde_json::json!({"result": "value", "data": "1"}));

        let value = serde_json::to_value(Response::Done).unwrap();
        assert_eq!(value, serde_json::json!({"result": "done"}));
    }
}
