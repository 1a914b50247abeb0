//! Generic document operations: get, query, set, update and atomic batches.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Database, DbError, DbResult};

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub collection: String,
    pub id: String,
    pub body: Value,
    /// Incremented on every write
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    /// Deserialize the body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> DbResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// A single mutation inside a batch.
///
/// Field names are dotted paths into the document body (`data.appointment_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOp {
    /// Create or replace the whole body.
    Set {
        collection: String,
        id: String,
        body: Value,
    },
    /// Merge fields into an existing document. Fails if the document is missing.
    Update {
        collection: String,
        id: String,
        fields: Value,
    },
    /// Merge fields only while `field` still holds one of `expected`.
    UpdateIf {
        collection: String,
        id: String,
        field: String,
        expected: Vec<Value>,
        fields: Value,
    },
    /// Store-native counter increment. Never lets the counter drop below zero.
    Increment {
        collection: String,
        id: String,
        field: String,
        delta: i64,
    },
}

impl WriteOp {
    pub fn set(collection: &str, id: &str, body: Value) -> Self {
        WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            body,
        }
    }

    pub fn update(collection: &str, id: &str, fields: Value) -> Self {
        WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        }
    }

    pub fn update_if(
        collection: &str,
        id: &str,
        field: &str,
        expected: Vec<Value>,
        fields: Value,
    ) -> Self {
        WriteOp::UpdateIf {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            expected,
            fields,
        }
    }

    pub fn increment(collection: &str, id: &str, field: &str, delta: i64) -> Self {
        WriteOp::Increment {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            delta,
        }
    }
}

/// Query predicate on a body field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn any_of(field: &str, values: Vec<Value>) -> Self {
        Filter::In(field.to_string(), values)
    }
}

/// Sort direction for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort field, compared either as the stored JSON value or as an instant.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Value(String),
    /// UTC RFC 3339 timestamp. Fraction widths vary, so it is compared as
    /// an instant rather than as text.
    Timestamp(String),
}

/// A collection query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(SortKey, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((SortKey::Value(field.to_string()), direction));
        self
    }

    pub fn order_by_time(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((SortKey::Timestamp(field.to_string()), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl Database {
    /// Get a document by collection and ID.
    pub fn get_document(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        self.conn
            .query_row(
                r#"
                SELECT collection, id, body, version, created_at, updated_at
                FROM documents
                WHERE collection = ?1 AND id = ?2
                "#,
                params![collection, id],
                map_document_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Run a query against one collection.
    pub fn query_documents(&self, query: &Query) -> DbResult<Vec<Document>> {
        let mut sql = String::from(
            "SELECT collection, id, body, version, created_at, updated_at FROM documents WHERE collection = ?",
        );
        let mut args: Vec<SqlValue> = vec![SqlValue::Text(query.collection.clone())];

        for filter in &query.filters {
            match filter {
                Filter::Eq(field, Value::Null) => {
                    sql.push_str(" AND json_extract(body, ?) IS NULL");
                    args.push(SqlValue::Text(json_path(field)));
                }
                Filter::Eq(field, value) => {
                    sql.push_str(" AND json_extract(body, ?) = ?");
                    args.push(SqlValue::Text(json_path(field)));
                    args.push(sql_value(value));
                }
                Filter::In(_, values) if values.is_empty() => {
                    sql.push_str(" AND 0");
                }
                Filter::In(field, values) => {
                    sql.push_str(" AND json_extract(body, ?) IN (");
                    sql.push_str(&placeholders(values.len()));
                    sql.push(')');
                    args.push(SqlValue::Text(json_path(field)));
                    args.extend(values.iter().map(sql_value));
                }
            }
        }

        match &query.order_by {
            Some((key, direction)) => {
                let direction = match direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                match key {
                    SortKey::Value(field) => {
                        sql.push_str(&format!(" ORDER BY json_extract(body, ?) {}", direction));
                        args.push(SqlValue::Text(json_path(field)));
                    }
                    SortKey::Timestamp(field) => {
                        // julianday() keeps milliseconds; the padded fraction
                        // digits order anything finer.
                        sql.push_str(&format!(
                            " ORDER BY julianday(json_extract(body, ?)) {dir}, \
                             substr(rtrim(substr(json_extract(body, ?), 21), 'Z') || '000000000', 1, 9) {dir}",
                            dir = direction
                        ));
                        args.push(SqlValue::Text(json_path(field)));
                        args.push(SqlValue::Text(json_path(field)));
                    }
                }
                sql.push_str(", id ASC");
            }
            None => sql.push_str(" ORDER BY id ASC"),
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            args.push(SqlValue::Integer(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), map_document_row)?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(row?.try_into()?);
        }
        Ok(documents)
    }

    /// Create or replace a single document outside of a batch.
    pub fn set_document(&self, collection: &str, id: &str, body: &Value) -> DbResult<()> {
        apply_op(&self.conn, &WriteOp::set(collection, id, body.clone()), &now())
    }

    /// Merge fields into a single existing document outside of a batch.
    pub fn update_document(&self, collection: &str, id: &str, fields: &Value) -> DbResult<()> {
        apply_op(&self.conn, &WriteOp::update(collection, id, fields.clone()), &now())
    }

    /// Apply a list of operations as one atomic unit.
    ///
    /// Runs inside a `BEGIN IMMEDIATE` transaction: any failing operation rolls
    /// back everything already applied and nothing is recorded in the ledger.
    pub fn batch_write(&self, label: &str, ops: &[WriteOp]) -> DbResult<BatchReceipt> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let timestamp = now();

        for op in ops {
            if let Err(e) = apply_op(&tx, op, &timestamp) {
                tracing::warn!(label, error = %e, "batch rolled back");
                return Err(e);
            }
        }

        let receipt = super::batches::append_batch(&tx, label, ops)?;
        tx.commit()?;

        tracing::debug!(
            label,
            seq = receipt.seq,
            ops = receipt.op_count,
            "batch committed"
        );
        Ok(receipt)
    }
}

/// Receipt for a committed batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReceipt {
    pub seq: i64,
    pub batch_hash: String,
    pub op_count: u32,
}

/// Apply one operation on a connection (or an open transaction).
fn apply_op(conn: &Connection, op: &WriteOp, timestamp: &str) -> DbResult<()> {
    match op {
        WriteOp::Set {
            collection,
            id,
            body,
        } => {
            if !body.is_object() {
                return Err(DbError::Constraint(format!(
                    "Document body for {}/{} must be a JSON object",
                    collection, id
                )));
            }
            conn.execute(
                r#"
                INSERT INTO documents (collection, id, body, version, created_at, updated_at)
                VALUES (?1, ?2, ?3, 1, ?4, ?4)
                ON CONFLICT(collection, id) DO UPDATE SET
                    body = excluded.body,
                    version = documents.version + 1,
                    updated_at = excluded.updated_at
                "#,
                params![collection, id, serde_json::to_string(body)?, timestamp],
            )?;
            Ok(())
        }
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            let rows_affected = conn.execute(
                r#"
                UPDATE documents SET
                    body = json_patch(body, ?3),
                    version = version + 1,
                    updated_at = ?4
                WHERE collection = ?1 AND id = ?2
                "#,
                params![collection, id, serde_json::to_string(fields)?, timestamp],
            )?;
            if rows_affected == 0 {
                return Err(DbError::NotFound(format!("{}/{}", collection, id)));
            }
            Ok(())
        }
        WriteOp::UpdateIf {
            collection,
            id,
            field,
            expected,
            fields,
        } => {
            if expected.is_empty() {
                return Err(DbError::Constraint(format!(
                    "Conditional update on {}/{} needs at least one expected value",
                    collection, id
                )));
            }
            // A null expectation also matches a missing field.
            let (nulls, values): (Vec<&Value>, Vec<&Value>) =
                expected.iter().partition(|v| v.is_null());
            let mut guard = Vec::new();
            if !values.is_empty() {
                guard.push(format!("json_extract(body, ?) IN ({})", placeholders(values.len())));
            }
            if !nulls.is_empty() {
                guard.push("json_extract(body, ?) IS NULL".to_string());
            }
            let sql = format!(
                r#"
                UPDATE documents SET
                    body = json_patch(body, ?),
                    version = version + 1,
                    updated_at = ?
                WHERE collection = ? AND id = ? AND ({})
                "#,
                guard.join(" OR ")
            );
            let mut args: Vec<SqlValue> = vec![
                SqlValue::Text(serde_json::to_string(fields)?),
                SqlValue::Text(timestamp.to_string()),
                SqlValue::Text(collection.clone()),
                SqlValue::Text(id.clone()),
            ];
            if !values.is_empty() {
                args.push(SqlValue::Text(json_path(field)));
                args.extend(values.iter().map(|v| sql_value(v)));
            }
            if !nulls.is_empty() {
                args.push(SqlValue::Text(json_path(field)));
            }

            let rows_affected = conn.execute(&sql, params_from_iter(args.iter()))?;
            if rows_affected == 0 {
                if !document_exists(conn, collection, id)? {
                    return Err(DbError::NotFound(format!("{}/{}", collection, id)));
                }
                return Err(DbError::PreconditionFailed {
                    collection: collection.clone(),
                    id: id.clone(),
                    field: field.clone(),
                });
            }
            Ok(())
        }
        WriteOp::Increment {
            collection,
            id,
            field,
            delta,
        } => {
            let rows_affected = conn.execute(
                r#"
                UPDATE documents SET
                    body = json_set(body, ?1, COALESCE(json_extract(body, ?1), 0) + ?2),
                    version = version + 1,
                    updated_at = ?3
                WHERE collection = ?4 AND id = ?5
                  AND COALESCE(json_extract(body, ?1), 0) + ?2 >= 0
                "#,
                params![json_path(field), delta, timestamp, collection, id],
            )?;
            if rows_affected == 0 {
                if !document_exists(conn, collection, id)? {
                    return Err(DbError::NotFound(format!("{}/{}", collection, id)));
                }
                return Err(DbError::Constraint(format!(
                    "Counter {}/{}.{} cannot drop below zero",
                    collection, id, field
                )));
            }
            Ok(())
        }
    }
}

fn document_exists(conn: &Connection, collection: &str, id: &str) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE collection = ?1 AND id = ?2",
        params![collection, id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Intermediate row struct for database mapping.
struct DocumentRow {
    collection: String,
    id: String,
    body: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

fn map_document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        collection: row.get(0)?,
        id: row.get(1)?,
        body: row.get(2)?,
        version: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl TryFrom<DocumentRow> for Document {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            collection: row.collection,
            id: row.id,
            body: serde_json::from_str(&row.body)?,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Convert a dotted field name into a SQLite JSON path.
fn json_path(field: &str) -> String {
    format!("$.{}", field)
}

/// Bind a JSON scalar the way `json_extract` reports it.
fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
