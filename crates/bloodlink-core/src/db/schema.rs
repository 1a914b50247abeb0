//! SQLite schema definition.

/// Complete database schema for bloodlink.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Documents (key-document store, one row per record)
-- ============================================================================

CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL CHECK (json_valid(body)),  -- JSON object
    version INTEGER NOT NULL DEFAULT 1,           -- bumped on every write
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    PRIMARY KEY (collection, id)
);

-- Hot query paths: donors by blood type, appointments by request, inbox by user
CREATE INDEX IF NOT EXISTS idx_documents_blood_type
    ON documents(collection, json_extract(body, '$.blood_type'));
CREATE INDEX IF NOT EXISTS idx_documents_linked_request
    ON documents(collection, json_extract(body, '$.linked_patient_id'));
CREATE INDEX IF NOT EXISTS idx_documents_user
    ON documents(collection, json_extract(body, '$.user_id'));

-- ============================================================================
-- Batch Ledger (Append-Only - one row per committed batch)
-- ============================================================================

CREATE TABLE IF NOT EXISTS write_batches (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_hash TEXT NOT NULL UNIQUE,              -- SHA-256 of prev_hash + payload
    prev_hash TEXT,                               -- NULL for the first batch
    label TEXT NOT NULL,
    op_count INTEGER NOT NULL,
    payload TEXT NOT NULL,                        -- JSON array of applied ops
    committed_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TRIGGER IF NOT EXISTS write_batches_no_update BEFORE UPDATE ON write_batches
BEGIN
    SELECT RAISE(ABORT, 'Batch ledger is append-only');
END;

CREATE TRIGGER IF NOT EXISTS write_batches_no_delete BEFORE DELETE ON write_batches
BEGIN
    SELECT RAISE(ABORT, 'Batch ledger is append-only');
END;
"#;
