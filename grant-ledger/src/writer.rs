//! Single-writer task for the ledger
//!
//! Hosts that receive requests from many tasks route them through one
//! [`LedgerWriter`]. Operations reach the ledger in mailbox order, one at a
//! time, and each caller gets its result back on a oneshot channel.
//!
//! ```text
//!   LedgerHandle (Clone) ──┐
//!   LedgerHandle (Clone) ──┼── mpsc (bounded) ──▶ LedgerWriter ──▶ Ledger::execute
//!   LedgerHandle (Clone) ──┘
//! ```

use crate::operation::{Operation, Response};
use crate::{Error, Ledger, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the writer task
#[derive(Debug)]
pub enum WriterMessage {
    /// Run one operation
    Execute {
        /// Operation to run
        operation: Operation,
        /// Where to deliver the result
        response: oneshot::Sender<Result<Response>>,
    },

    /// Stop the writer; queued operations are dropped
    Shutdown,
}

/// Task that owns the ledger's write path
#[derive(Debug)]
pub struct LedgerWriter {
    ledger: Arc<Ledger>,
    mailbox: mpsc::Receiver<WriterMessage>,
}

impl LedgerWriter {
    /// Create new writer
    pub fn new(ledger: Arc<Ledger>, mailbox: mpsc::Receiver<WriterMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                WriterMessage::Execute {
                    operation,
                    response,
                } => {
                    let name = operation.name();
                    let result = self.ledger.execute(operation);
                    if let Err(e) = &result {
                        tracing::warn!(operation = name, error = %e, "Operation rejected");
                    }
                    // Caller may have gone away
                    let _ = response.send(result);
                }
                WriterMessage::Shutdown => break,
            }
        }

        tracing::info!("Ledger writer stopped");
    }
}

/// Handle for sending operations to the writer
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<WriterMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<WriterMessage>) -> Self {
        Self { sender }
    }

    /// Run an operation on the writer and wait for its result
    pub async fn execute(&self, operation: Operation) -> Result<Response> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WriterMessage::Execute {
                operation,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Writer mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Stop the writer
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(WriterMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Writer mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the writer task
pub fn spawn_ledger_writer(ledger: Arc<Ledger>, mailbox_capacity: usize) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let writer = LedgerWriter::new(ledger, rx);

    tokio::spawn(async move {
        writer.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActorId;
    use crate::Config;
    use rust_decimal::Decimal;

    fn spawn() -> (Arc<Ledger>, LedgerHandle) {
        let ledger = Arc::new(Ledger::in_memory(Config::default()).unwrap());
        let handle = spawn_ledger_writer(ledger.clone(), 16);
        (ledger, handle)
    }

    #[tokio::test]
    async fn test_execute_through_writer() {
        let (ledger, handle) = spawn();

        handle.execute(Operation::SetUp).await.unwrap();
        let response = handle
            .execute(Operation::Spend {
                from_actor: "102".to_string(),
                to_actor: "104".to_string(),
                amount: "8000".to_string(),
                expenditure_type: "Equipment".to_string(),
            })
            .await
            .unwrap();

        match response {
            Response::Expenditure(exp) => assert_eq!(exp.expenditure_id.as_str(), "EXP-201"),
            other => panic!("unexpected response: {:?}", other),
        }

        let grantee = ledger.get_actor(&ActorId::new("102")).unwrap();
        assert_eq!(grantee.spent, Decimal::new(31_000, 0));
    }

    #[tokio::test]
    async fn test_concurrent_spends_get_distinct_ids() {
        let (ledger, handle) = spawn();
        handle.execute(Operation::SetUp).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .execute(Operation::Spend {
                        from_actor: "103".to_string(),
                        to_actor: "104".to_string(),
                        amount: "100".to_string(),
                        expenditure_type: "Supplies".to_string(),
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let all = ledger.all_expenditures().unwrap();
        assert_eq!(all.len(), 10);
        let mut ids: Vec<&str> = all.iter().map(|e| e.expenditure_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10);

        let sub_grantee = ledger.get_actor(&ActorId::new("103")).unwrap();
        assert_eq!(sub_grantee.spent, Decimal::new(13_000, 0));
    }

    #[tokio::test]
    async fn test_errors_are_delivered() {
        let (_ledger, handle) = spawn();
        let result = handle
            .execute(Operation::GetActor {
                actor_id: "999".to_string(),
            })
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_closed_after_shutdown() {
        let (_ledger, handle) = spawn();
        handle.shutdown().await.unwrap();

        // Let the writer observe the shutdown and drop its receiver
        tokio::task::yield_now().await;
        for _ in 0..100 {
            if handle.sender.is_closed() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let result = handle.execute(Operation::Wallet).await;
        assert!(matches!(result, Err(Error::Concurrency(_))));
    }
}
