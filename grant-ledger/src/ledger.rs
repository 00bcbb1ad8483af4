//! Main ledger orchestration layer
//!
//! Ties the store, registries and settlement engine into one API. Every
//! public mutation runs in its own [`Transaction`] under a single writer
//! lock: it commits as one atomic batch or leaves no trace.
//!
//! # Example
//!
//! ```no_run
//! use grant_ledger::{types::ActorId, Config, Ledger};
//! use rust_decimal::Decimal;
//!
//! fn main() -> grant_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!     ledger.set_up()?;
//!
//!     let exp = ledger.spend(
//!         &ActorId::new("102"),
//!         &ActorId::new("104"),
//!         Decimal::new(8000, 0),
//!         "Equipment",
//!     )?;
//!     ledger.release_fund(&ActorId::new("101"), &[exp.expenditure_id])?;
//!     Ok(())
//! }
//! ```

use crate::{
    actors,
    clock::{Clock, SystemClock},
    expenditures::{self, SpendRequest},
    index::{self, IndexKind},
    operation::{Operation, Response},
    query, reimbursements, release,
    settlement::{self, Settlement},
    storage::{MemoryStore, RocksStore, Store},
    transaction::Transaction,
    types::{
        parse_amount, parse_date, parse_positive_amount, parse_timestamp, require_non_empty,
        Actor, ActorId, Balances, Expenditure, ExpenditureId, ExpenditureStatus, Reimbursement,
        ReimbursementId, TransactionKind,
    },
    Config, Metrics, Result,
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Main ledger interface
pub struct Ledger {
    /// Backing key-value store
    store: Arc<dyn Store>,

    /// Source of record dates
    clock: Arc<dyn Clock>,

    /// Single-writer lock; queries share it, mutations hold it exclusively
    writer: RwLock<()>,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Ledger over any store
    pub fn new(store: Arc<dyn Store>, config: Config) -> Result<Self> {
        Ok(Self {
            store,
            clock: Arc::new(SystemClock),
            writer: RwLock::new(()),
            metrics: Metrics::new()?,
            config,
        })
    }

    /// Open ledger on RocksDB at `config.data_dir`
    pub fn open(config: Config) -> Result<Self> {
        let store = RocksStore::open(&config)?;
        Self::new(Arc::new(store), config)
    }

    /// Ledger on a fresh in-memory store
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn strict(&self) -> bool {
        self.config.strict_indices
    }

    /// Run `f` in a transaction under the writer lock and commit on success
    fn mutate<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let started = Instant::now();
        let _guard = self.writer.write();

        let mut tx = Transaction::begin(self.store.as_ref());
        let result = match f(&mut tx) {
            Ok(value) => tx.commit().map(|()| value),
            Err(err) => Err(err),
        };

        self.finish(operation, started, &result);
        result
    }

    /// Run `f` against committed state; no mutation commits while it runs
    fn view<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let started = Instant::now();
        let _guard = self.writer.read();

        let tx = Transaction::begin(self.store.as_ref());
        let result = f(&tx);
        self.finish(operation, started, &result);
        result
    }

    /// Pass a parsed argument through, counting a rejection as a failed `operation`
    fn argument<T>(&self, operation: &'static str, started: Instant, parsed: Result<T>) -> Result<T> {
        if parsed.is_err() {
            self.finish(operation, started, &parsed);
        }
        parsed
    }

    fn finish<T>(&self, operation: &'static str, started: Instant, result: &Result<T>) {
        self.metrics
            .record_operation(operation, result.is_ok(), started.elapsed().as_secs_f64());
        if let Err(err) = result {
            tracing::debug!(operation, error = %err, "Operation failed");
        }
    }

    // Bootstrap

    /// Reset the three index lists to empty
    ///
    /// Records stay in the store but are no longer enumerable.
    pub fn init(&self) -> Result<()> {
        self.mutate("init", |tx| {
            for kind in IndexKind::ALL {
                index::save(tx, kind, &[])?;
            }
            Ok(())
        })?;
        tracing::info!("Indices reset");
        Ok(())
    }

    /// Seed the demo grantor (101), grantee (102), sub-grantee (103) and supplier (104)
    pub fn set_up(&self) -> Result<Vec<Actor>> {
        let strict = self.strict();
        let actors = self.mutate("setup", |tx| {
            demo_actors()
                .into_iter()
                .map(|(id, name, balances)| {
                    actors::create_actor(tx, &ActorId::new(id), name, balances, strict)
                })
                .collect::<Result<Vec<_>>>()
        })?;
        tracing::info!(count = actors.len(), "Demo actors seeded");
        Ok(actors)
    }

    // Actor ledger

    /// Register an actor
    pub fn create_actor(
        &self,
        actor_id: &ActorId,
        actor_name: &str,
        balances: Balances,
    ) -> Result<Actor> {
        let strict = self.strict();
        let actor = self.mutate("create_actor", |tx| {
            actors::create_actor(tx, actor_id, actor_name, balances, strict)
        })?;
        tracing::info!(actor_id = %actor.actor_id, name = %actor.actor_name, "Actor registered");
        Ok(actor)
    }

    /// Look up an actor
    pub fn get_actor(&self, actor_id: &ActorId) -> Result<Actor> {
        self.view("get_actor", |tx| actors::get_actor(tx, actor_id))
    }

    // Expenditure registry

    /// Store an expenditure as given, without settlement
    pub fn create_expenditure(&self, expenditure: Expenditure) -> Result<Expenditure> {
        let strict = self.strict();
        let expenditure = self.mutate("create_expenditure", |tx| {
            expenditures::create_expenditure(tx, expenditure, strict)
        })?;
        tracing::info!(expenditure_id = %expenditure.expenditure_id, "Expenditure stored");
        Ok(expenditure)
    }

    /// Look up an expenditure
    pub fn get_expenditure(&self, expenditure_id: &ExpenditureId) -> Result<Expenditure> {
        self.view("get_expenditure", |tx| {
            expenditures::get_expenditure(tx, expenditure_id)
        })
    }

    /// Record a spend and settle it against the spender's award
    ///
    /// Amounts above the approval threshold are recorded `Pending`.
    pub fn spend(
        &self,
        from_actor: &ActorId,
        to_actor: &ActorId,
        amount: Decimal,
        expenditure_type: &str,
    ) -> Result<Expenditure> {
        let strict = self.strict();
        let threshold = self.config.approval_threshold;
        let date = self.clock.now();

        let (expenditure, _) = self.mutate("spend", |tx| {
            expenditures::record_spend(
                tx,
                SpendRequest {
                    from_actor,
                    to_actor,
                    amount,
                    expenditure_type,
                },
                date,
                threshold,
                strict,
            )
        })?;

        self.metrics.record_settlement(TransactionKind::Spend, amount);
        tracing::info!(
            expenditure_id = %expenditure.expenditure_id,
            from = %from_actor,
            to = %to_actor,
            amount = %amount,
            status = %expenditure.status,
            "Spend recorded"
        );

        Ok(expenditure)
    }

    // Reimbursement registry

    /// Store a reimbursement as given, without settlement
    pub fn create_reimbursement(&self, reimbursement: Reimbursement) -> Result<Reimbursement> {
        let strict = self.strict();
        let reimbursement = self.mutate("create_reimbursement", |tx| {
            reimbursements::create_reimbursement(tx, reimbursement, strict)
        })?;
        tracing::info!(reimbursement_id = %reimbursement.reimbursement_id, "Reimbursement stored");
        Ok(reimbursement)
    }

    /// Look up a reimbursement
    pub fn get_reimbursement(&self, reimbursement_id: &ReimbursementId) -> Result<Reimbursement> {
        self.view("get_reimbursement", |tx| {
            reimbursements::get_reimbursement(tx, reimbursement_id)
        })
    }

    // Settlement

    /// Settle directly between two actors
    pub fn transfer(
        &self,
        actor_a: &ActorId,
        actor_b: &ActorId,
        amount: Decimal,
        kind: TransactionKind,
    ) -> Result<Settlement> {
        let settlement = self.mutate("transfer", |tx| {
            settlement::transfer(tx, actor_a, actor_b, amount, kind)
        })?;

        self.metrics.record_settlement(kind, amount);
        tracing::info!(
            payer = %actor_a,
            receiver = %actor_b,
            amount = %amount,
            kind = %kind,
            "Transfer settled"
        );

        Ok(settlement)
    }

    // Fund release

    /// Release funds from `payer` against each listed expenditure
    pub fn release_fund(
        &self,
        payer: &ActorId,
        expenditure_ids: &[ExpenditureId],
    ) -> Result<Vec<Reimbursement>> {
        let strict = self.strict();
        let date = self.clock.now();

        let released = self.mutate("release_fund", |tx| {
            release::release_fund(tx, payer, expenditure_ids, date, strict)
        })?;

        for reimbursement in &released {
            self.metrics
                .record_settlement(TransactionKind::Fund, reimbursement.amount);
            tracing::info!(
                reimbursement_id = %reimbursement.reimbursement_id,
                expenditure_id = %reimbursement.expenditure_id,
                payer = %payer,
                amount = %reimbursement.amount,
                "Fund released"
            );
        }

        Ok(released)
    }

    // Queries

    /// Every expenditure, in index order
    pub fn all_expenditures(&self) -> Result<Vec<Expenditure>> {
        let strict = self.strict();
        self.view("all_expenditures", |tx| query::all_expenditures(tx, strict))
    }

    /// Expenditures awaiting release, in index order
    pub fn pending_expenditures(&self) -> Result<Vec<Expenditure>> {
        let strict = self.strict();
        self.view("pending_expenditures", |tx| {
            query::pending_expenditures(tx, strict)
        })
    }

    /// Expenditures dated strictly after `threshold`
    pub fn expenditures_after(&self, threshold: NaiveDate) -> Result<Vec<Expenditure>> {
        let strict = self.strict();
        self.view("expenditures_after", |tx| {
            query::expenditures_after(tx, threshold, strict)
        })
    }

    /// Every reimbursement, in index order
    pub fn all_reimbursements(&self) -> Result<Vec<Reimbursement>> {
        let strict = self.strict();
        self.view("all_reimbursements", |tx| {
            query::all_reimbursements(tx, strict)
        })
    }

    /// Every actor with balances, in index order
    pub fn wallet(&self) -> Result<Vec<Actor>> {
        let strict = self.strict();
        self.view("wallet", |tx| query::wallet(tx, strict))
    }

    // Raw key access

    /// Read raw bytes by key
    pub fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.view("read", |tx| tx.get_raw(key))
    }

    /// Write raw bytes by key (no validation, no indexing)
    pub fn write(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.mutate("write", |tx| {
            require_non_empty("key", key)?;
            tx.put_raw(key, value);
            Ok(())
        })?;
        tracing::debug!(key, "Raw write");
        Ok(())
    }

    /// Delete a record and drop its id from every index
    pub fn delete(&self, key: &str) -> Result<()> {
        let strict = self.strict();
        self.mutate("delete", |tx| {
            require_non_empty("key", key)?;
            tx.delete(key);
            if !IndexKind::is_index_key(key) {
                for kind in IndexKind::ALL {
                    index::remove(tx, kind, key, strict)?;
                }
            }
            Ok(())
        })?;
        tracing::info!(key, "Record deleted");
        Ok(())
    }

    // Dispatch

    /// Validate, parse and run one operation
    pub fn execute(&self, operation: Operation) -> Result<Response> {
        let name = operation.name();
        let started = Instant::now();
        tracing::debug!(operation = name, "Executing");

        match operation {
            Operation::Init => self.init().map(|()| Response::Done),

            Operation::SetUp => self.set_up().map(Response::Actors),

            Operation::CreateActor {
                actor_id,
                actor_name,
                committed,
                reimbursed,
                awarded,
                spent,
                received,
                delegated,
            } => {
                let balances = self.argument(
                    name,
                    started,
                    parse_balances(
                        &committed,
                        &reimbursed,
                        &awarded,
                        &spent,
                        &received,
                        &delegated,
                    ),
                )?;
                self.create_actor(&ActorId::new(actor_id), &actor_name, balances)
                    .map(Response::Actor)
            }

            Operation::GetActor { actor_id } => {
                self.get_actor(&ActorId::new(actor_id)).map(Response::Actor)
            }

            Operation::CreateExpenditure {
                expenditure_id,
                amount,
                date,
                expenditure_type,
                status,
                from_actor,
                to_actor,
            } => {
                let expenditure = Expenditure {
                    expenditure_id: ExpenditureId::new(expenditure_id),
                    amount: self.argument(name, started, parse_positive_amount("amount", &amount))?,
                    date: self.argument(name, started, parse_timestamp(&date))?,
                    expenditure_type,
                    status: self.argument(name, started, status.parse::<ExpenditureStatus>())?,
                    from_actor: ActorId::new(from_actor),
                    to_actor: ActorId::new(to_actor),
                };
                self.create_expenditure(expenditure)
                    .map(Response::Expenditure)
            }

            Operation::GetExpenditure { expenditure_id } => self
                .get_expenditure(&ExpenditureId::new(expenditure_id))
                .map(Response::Expenditure),

            Operation::Spend {
                from_actor,
                to_actor,
                amount,
                expenditure_type,
            } => {
                let amount =
                    self.argument(name, started, parse_positive_amount("amount", &amount))?;
                self.spend(
                    &ActorId::new(from_actor),
                    &ActorId::new(to_actor),
                    amount,
                    &expenditure_type,
                )
                .map(Response::Expenditure)
            }

            Operation::CreateReimbursement {
                reimbursement_id,
                amount,
                from_actor,
                to_actor,
                date,
                expenditure_id,
            } => {
                let reimbursement = Reimbursement {
                    reimbursement_id: ReimbursementId::new(reimbursement_id),
                    amount: self.argument(name, started, parse_positive_amount("amount", &amount))?,
                    from_actor: ActorId::new(from_actor),
                    to_actor: ActorId::new(to_actor),
                    date: self.argument(name, started, parse_timestamp(&date))?,
                    expenditure_id: ExpenditureId::new(expenditure_id),
                };
                self.create_reimbursement(reimbursement)
                    .map(Response::Reimbursement)
            }

            Operation::GetReimbursement { reimbursement_id } => self
                .get_reimbursement(&ReimbursementId::new(reimbursement_id))
                .map(Response::Reimbursement),

            Operation::Transfer {
                actor_a,
                actor_b,
                amount,
                kind,
            } => {
                let amount =
                    self.argument(name, started, parse_positive_amount("amount", &amount))?;
                let kind = self.argument(name, started, kind.parse::<TransactionKind>())?;
                self.transfer(&ActorId::new(actor_a), &ActorId::new(actor_b), amount, kind)
                    .map(|settlement| Response::Actors(vec![settlement.payer, settlement.receiver]))
            }

            Operation::ReleaseFund {
                payer,
                expenditure_ids,
            } => {
                let ids: Vec<ExpenditureId> =
                    expenditure_ids.into_iter().map(ExpenditureId::new).collect();
                self.release_fund(&ActorId::new(payer), &ids)
                    .map(Response::Reimbursements)
            }

            Operation::AllExpenditures => self.all_expenditures().map(Response::Expenditures),

            Operation::PendingExpenditures => {
                self.pending_expenditures().map(Response::Expenditures)
            }

            Operation::ExpendituresAfter { date } => {
                let threshold = self.argument(name, started, parse_date(&date))?;
                self.expenditures_after(threshold)
                    .map(Response::Expenditures)
            }

            Operation::AllReimbursements => {
                self.all_reimbursements().map(Response::Reimbursements)
            }

            Operation::Wallet => self.wallet().map(Response::Actors),

            Operation::Read { key } => self.read(&key).map(|value| {
                Response::Value(value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
            }),

            Operation::Write { key, value } => {
                self.write(&key, value.into_bytes()).map(|()| Response::Done)
            }

            Operation::Delete { key } => self.delete(&key).map(|()| Response::Done),
        }
    }
}

fn parse_balances(
    committed: &str,
    reimbursed: &str,
    awarded: &str,
    spent: &str,
    received: &str,
    delegated: &str,
) -> Result<Balances> {
    Ok(Balances {
        committed: parse_amount("committed", committed)?,
        reimbursed: parse_amount("reimbursed", reimbursed)?,
        awarded: parse_amount("awarded", awarded)?,
        spent: parse_amount("spent", spent)?,
        received: parse_amount("received", received)?,
        delegated: parse_amount("delegated", delegated)?,
    })
}

/// Demo participants; blank balances are zero
fn demo_actors() -> Vec<(&'static str, &'static str, Balances)> {
    let amount = |units: i64| Decimal::new(units, 0);

    vec![
        (
            "101",
            "PPM Foundation",
            Balances {
                committed: amount(125_000),
                reimbursed: amount(55_000),
                ..Default::default()
            },
        ),
        (
            "102",
            "Stanford University",
            Balances {
                awarded: amount(125_000),
                spent: amount(23_000),
                received: amount(55_000),
                delegated: amount(45_000),
                ..Default::default()
            },
        ),
        (
            "103",
            "John Hopkins University",
            Balances {
                awarded: amount(45_000),
                spent: amount(12_000),
                received: amount(25_000),
                ..Default::default()
            },
        ),
        (
            "104",
            "Dixon consulting",
            Balances {
                received: amount(35_000),
                ..Default::default()
            },
        ),
    ]
}
