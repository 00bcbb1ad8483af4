//! Secondary indices
//!
//! Each entity kind keeps one ordered JSON list of identifiers under a
//! well-known key. Lists are appended on create and never reordered. All
//! read-modify-write cycles run inside the caller's [`Transaction`], so an
//! append commits together with the record it indexes.

use crate::{transaction::Transaction, Error, Result};

/// Indexed entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// All registered actors
    Actor,
    /// All recorded expenditures
    Expenditure,
    /// All created reimbursements
    Reimbursement,
}

impl IndexKind {
    /// Every index, in a fixed order
    pub const ALL: [IndexKind; 3] = [
        IndexKind::Actor,
        IndexKind::Expenditure,
        IndexKind::Reimbursement,
    ];

    /// Store key holding this index
    pub fn key(&self) -> &'static str {
        match self {
            IndexKind::Actor => "_actorindex",
            IndexKind::Expenditure => "_expenditureindex",
            IndexKind::Reimbursement => "_reimbursementindex",
        }
    }

    /// Whether `key` names one of the index lists
    pub fn is_index_key(key: &str) -> bool {
        Self::ALL.iter().any(|kind| kind.key() == key)
    }
}

/// Reject record identifiers that would shadow an index list
pub fn ensure_not_reserved(field: &str, id: &str) -> Result<()> {
    if IndexKind::is_index_key(id) {
        return Err(Error::InvalidArgument(format!(
            "{} {:?} is reserved for an index",
            field, id
        )));
    }
    Ok(())
}

/// Load an index list
///
/// A missing list is empty. An undecodable list is treated as empty unless
/// `strict`, in which case it fails with [`Error::IndexCorruption`].
pub fn load(tx: &Transaction<'_>, kind: IndexKind, strict: bool) -> Result<Vec<String>> {
    let Some(bytes) = tx.get_raw(kind.key())? else {
        return Ok(Vec::new());
    };

    match serde_json::from_slice::<Option<Vec<String>>>(&bytes) {
        Ok(ids) => Ok(ids.unwrap_or_default()),
        Err(err) if strict => Err(Error::IndexCorruption(format!("{}: {}", kind.key(), err))),
        Err(err) => {
            tracing::warn!(index = kind.key(), error = %err, "Corrupt index treated as empty");
            Ok(Vec::new())
        }
    }
}

/// Overwrite an index list
pub fn save(tx: &mut Transaction<'_>, kind: IndexKind, ids: &[String]) -> Result<()> {
    tx.put(kind.key(), &ids)
}

/// Append one identifier
pub fn append(tx: &mut Transaction<'_>, kind: IndexKind, id: &str, strict: bool) -> Result<()> {
    let mut ids = load(tx, kind, strict)?;
    ids.push(id.to_string());
    save(tx, kind, &ids)
}

/// Remove the first occurrence of `id`; returns whether it was present
pub fn remove(tx: &mut Transaction<'_>, kind: IndexKind, id: &str, strict: bool) -> Result<bool> {
    let mut ids = load(tx, kind, strict)?;
    match ids.iter().position(|existing| existing == id) {
        Some(pos) => {
            ids.remove(pos);
            save(tx, kind, &ids)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Whether `id` is listed
pub fn contains(tx: &Transaction<'_>, kind: IndexKind, id: &str, strict: bool) -> Result<bool> {
    Ok(load(tx, kind, strict)?.iter().any(|existing| existing == id))
}

/// Next free `<prefix>-<n>` identifier, starting from `base + index length`
///
/// Probes forward past any key already taken, so a record orphaned by a
/// generic delete never gets overwritten.
pub fn next_sequence_id(
    tx: &Transaction<'_>,
    kind: IndexKind,
    prefix: &str,
    base: u64,
    strict: bool,
) -> Result<String> {
    let mut sequence = base + load(tx, kind, strict)?.len() as u64;
    loop {
        let candidate = format!("{}-{}", prefix, sequence);
        if !tx.exists(&candidate)? {
            return Ok(candidate);
        }
        sequence += 1;
    }
}
