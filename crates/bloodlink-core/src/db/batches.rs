//! Append-only ledger of committed batches.
//!
//! Each row hashes the previous row's hash together with the batch payload,
//! so rewriting history breaks the chain.

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use super::{BatchReceipt, Database, DbResult, WriteOp};

/// A committed batch as recorded in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
    pub seq: i64,
    pub batch_hash: String,
    pub prev_hash: Option<String>,
    pub label: String,
    pub op_count: u32,
    pub payload: String,
    pub committed_at: String,
}

/// Record a batch inside the caller's open transaction.
pub(super) fn append_batch(conn: &Connection, label: &str, ops: &[WriteOp]) -> DbResult<BatchReceipt> {
    let payload = serde_json::to_string(ops)?;
    let prev_hash: Option<String> = conn
        .query_row(
            "SELECT batch_hash FROM write_batches ORDER BY seq DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let batch_hash = chain_hash(prev_hash.as_deref(), &payload);
    conn.execute(
        r#"
        INSERT INTO write_batches (batch_hash, prev_hash, label, op_count, payload)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![batch_hash, prev_hash, label, ops.len() as u32, payload],
    )?;

    Ok(BatchReceipt {
        seq: conn.last_insert_rowid(),
        batch_hash,
        op_count: ops.len() as u32,
    })
}

/// Hash a payload onto the previous link of the chain.
pub fn chain_hash(prev_hash: Option<&str>, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.unwrap_or_default().as_bytes());
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

impl Database {
    /// Number of committed batches.
    pub fn batch_count(&self) -> DbResult<u32> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM write_batches", [], |row| row.get(0))?;
        Ok(count as u32)
    }

    /// List batches in commit order.
    pub fn list_batches(&self) -> DbResult<Vec<BatchRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, batch_hash, prev_hash, label, op_count, payload, committed_at
            FROM write_batches
            ORDER BY seq
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(BatchRecord {
                seq: row.get(0)?,
                batch_hash: row.get(1)?,
                prev_hash: row.get(2)?,
                label: row.get(3)?,
                op_count: row.get(4)?,
                payload: row.get(5)?,
                committed_at: row.get(6)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Recompute every link and check it against the stored hashes.
    pub fn verify_batch_chain(&self) -> DbResult<bool> {
        let mut prev: Option<String> = None;
        for record in self.list_batches()? {
            if record.prev_hash != prev {
                return Ok(false);
            }
            if chain_hash(prev.as_deref(), &record.payload) != record.batch_hash {
                return Ok(false);
            }
            prev = Some(record.batch_hash);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_hash_deterministic() {
        let h1 = chain_hash(None, "[]");
        let h2 = chain_hash(None, "[]");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, chain_hash(Some(&h1), "[]"));
    }

    #[test]
    fn test_batches_are_chained() {
        let db = Database::open_in_memory().unwrap();

        for i in 0..3 {
            db.batch_write(
                "seed",
                &[WriteOp::set("clinics", &format!("c{}", i), json!({"name": "Clinic"}))],
            )
            .unwrap();
        }

        let batches = db.list_batches().unwrap();
        assert_eq!(batches.len(), 3);
        assert!(batches[0].prev_hash.is_none());
        assert_eq!(batches[1].prev_hash.as_deref(), Some(batches[0].batch_hash.as_str()));
        assert_eq!(batches[2].op_count, 1);
        assert!(db.verify_batch_chain().unwrap());
    }

    #[test]
    fn test_tampered_payload_breaks_chain() {
        let db = Database::open_in_memory().unwrap();
        db.batch_write("seed", &[WriteOp::set("clinics", "c1", json!({"name": "A"}))])
            .unwrap();
        db.batch_write("seed", &[WriteOp::set("clinics", "c2", json!({"name": "B"}))])
            .unwrap();

        // Bypass the append-only triggers to simulate tampering
        db.conn()
            .execute_batch(
                "DROP TRIGGER write_batches_no_update;
                 UPDATE write_batches SET payload = '[]' WHERE seq = 1;",
            )
            .unwrap();

        assert!(!db.verify_batch_chain().unwrap());
    }
}
