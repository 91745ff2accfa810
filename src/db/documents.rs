//! Hierarchical document store on top of SQLite.
//!
//! Documents are schema-less JSON bodies addressed by a collection path
//! (`organizations/{org}/members`) and a document id. Every write bumps the
//! global revision counter in `meta`.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;

/// A stored document: its id within the collection plus the JSON body.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Deserialize the body into a typed model.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            tracing::error!("Corrupt document {}: {}", self.id, e);
            AppError::Internal(format!("Stored document {} is malformed", self.id))
        })
    }
}

/// Build a collection path from its segments.
///
/// Segments must be non-empty and must not contain `/`.
pub fn collection_path(segments: &[&str]) -> Result<String, AppError> {
    for segment in segments {
        validate_segment(segment)?;
    }
    Ok(segments.join("/"))
}

/// Validate a single path segment (collection name or document id).
pub fn validate_segment(segment: &str) -> Result<(), AppError> {
    if segment.trim().is_empty() {
        return Err(AppError::Validation(
            "Path segments must not be empty".to_string(),
        ));
    }
    if segment.contains('/') {
        return Err(AppError::Validation(format!(
            "Path segment '{}' must not contain '/'",
            segment
        )));
    }
    Ok(())
}

/// Document store backed by the `documents` table.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// List every document in a collection, in insertion order.
    pub async fn list(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        let rows = sqlx::query("SELECT id, data FROM documents WHERE collection = ? ORDER BY rowid")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(document_from_row).collect()
    }

    /// Get a single document.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        let row = sqlx::query("SELECT id, data FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(document_from_row).transpose()
    }

    /// Find documents whose top-level string `field` equals `value`.
    pub async fn where_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, AppError> {
        let rows = sqlx::query(
            "SELECT id, data FROM documents WHERE collection = ? AND json_extract(data, ?) = ? ORDER BY rowid",
        )
        .bind(collection)
        .bind(format!("$.{}", field))
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(document_from_row).collect()
    }

    /// Add a document unless the collection already holds one whose `field` equals `value`.
    ///
    /// Returns `None` when the value is taken. The check and the insert share one write
    /// transaction.
    pub async fn add_unique(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        data: Value,
    ) -> Result<Option<String>, AppError> {
        let (mut tx, now) = self.begin_write().await?;

        let taken: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM documents WHERE collection = ? AND json_extract(data, ?) = ? LIMIT 1",
        )
        .bind(collection)
        .bind(format!("$.{}", field))
        .bind(value)
        .fetch_optional(&mut *tx)
        .await?;

        if taken.is_some() {
            // Dropping the transaction rolls back the revision bump.
            return Ok(None);
        }

        let id = uuid::Uuid::new_v4().to_string();
        put_document(&mut tx, collection, &id, &data, &now).await?;
        tx.commit().await?;

        Ok(Some(id))
    }

    /// Merge-write a document under a known id, creating it if missing.
    ///
    /// Object fields are merged into the existing body; any other value is overwritten.
    pub async fn set(&self, collection: &str, id: &str, data: Value) -> Result<Value, AppError> {
        validate_segment(id)?;
        let (mut tx, now) = self.begin_write().await?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT data FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let body = match existing {
            Some(raw) => {
                let mut current = parse_stored(id, &raw)?;
                merge_json(&mut current, data);
                current
            }
            None => data,
        };

        put_document(&mut tx, collection, id, &body, &now).await?;
        tx.commit().await?;

        Ok(body)
    }

    /// Open a transaction that already holds SQLite's write lock.
    ///
    /// The revision bump is the first statement, so every read that follows sees the
    /// latest committed data and concurrent writers queue on `busy_timeout`.
    async fn begin_write(&self) -> Result<(Transaction<'static, Sqlite>, String), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        Ok((tx, now))
    }
}

async fn put_document(
    tx: &mut Transaction<'static, Sqlite>,
    collection: &str,
    id: &str,
    body: &Value,
    now: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO documents (collection, id, data, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(collection, id) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(collection)
    .bind(id)
    .bind(body.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Parse a stored body; bad JSON in the table is a server fault.
fn parse_stored(id: &str, raw: &str) -> Result<Value, AppError> {
    serde_json::from_str(raw).map_err(|e| {
        tracing::error!("Corrupt document {}: {}", id, e);
        AppError::Internal(format!("Stored document {} is malformed", id))
    })
}

/// Recursively merge `patch` into `target`.
fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(current), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let nested = value.is_object() && current.get(&key).is_some_and(Value::is_object);
                if nested {
                    if let Some(existing) = current.get_mut(&key) {
                        merge_json(existing, value);
                    }
                } else {
                    current.insert(key, value);
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Document, AppError> {
    let id: String = row.get("id");
    let raw: String = row.get("data");
    let data = parse_stored(&id, &raw)?;
    Ok(Document { id, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn store() -> (DocumentStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = crate::db::init_database(&temp_dir.path().join("docs.sqlite"))
            .await
            .unwrap();
        (DocumentStore::new(pool), temp_dir)
    }

    #[test]
    fn test_collection_path_rejects_bad_segments() {
        assert_eq!(
            collection_path(&["organizations", "162nd", "members"]).unwrap(),
            "organizations/162nd/members"
        );
        assert!(collection_path(&["organizations", "", "members"]).is_err());
        assert!(collection_path(&["organizations", "a/b", "members"]).is_err());
    }

    #[test]
    fn test_merge_json_nested() {
        let mut target = json!({ "a": 1, "nested": { "x": 1, "y": 2 }, "list": [1, 2] });
        merge_json(
            &mut target,
            json!({ "b": 2, "nested": { "y": 3 }, "list": [9] }),
        );
        assert_eq!(
            target,
            json!({ "a": 1, "b": 2, "nested": { "x": 1, "y": 3 }, "list": [9] })
        );
    }

    #[tokio::test]
    async fn test_set_merge_keeps_unknown_fields() {
        let (store, _dir) = store().await;
        store
            .set("c", "doc", json!({ "keep": true, "v": 1 }))
            .await
            .unwrap();
        store
            .set("c", "doc", json!({ "v": 2 }))
            .await
            .unwrap();

        let doc = store.get("c", "doc").await.unwrap().unwrap();
        assert_eq!(doc.data, json!({ "keep": true, "v": 2 }));
    }

    #[tokio::test]
    async fn test_add_list_and_where_eq() {
        let (store, _dir) = store().await;
        let before = store.revision_id().await.unwrap();

        for (collection, name) in [("people", "anna"), ("people", "ben"), ("other", "anna")] {
            store
                .add_unique(collection, "name", name, json!({ "name": name }))
                .await
                .unwrap();
        }

        let people = store.list("people").await.unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].data["name"], "anna");

        let annas = store.where_eq("people", "name", "anna").await.unwrap();
        assert_eq!(annas.len(), 1);
        assert!(store
            .where_eq("people", "name", "carl")
            .await
            .unwrap()
            .is_empty());

        assert_eq!(store.revision_id().await.unwrap(), before + 3);
    }

    #[tokio::test]
    async fn test_add_unique_rejects_taken_value() {
        let (store, _dir) = store().await;

        let first = store
            .add_unique("people", "name", "anna", json!({ "name": "anna" }))
            .await
            .unwrap();
        assert!(first.is_some());
        let revision = store.revision_id().await.unwrap();

        let second = store
            .add_unique("people", "name", "anna", json!({ "name": "anna", "n": 2 }))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(store.list("people").await.unwrap().len(), 1);
        // A refused add leaves the revision alone.
        assert_eq!(store.revision_id().await.unwrap(), revision);

        assert!(store
            .add_unique("other", "name", "anna", json!({ "name": "anna" }))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_internal_error() {
        let (store, _dir) = store().await;
        sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at, updated_at) VALUES ('c', 'bad', '{not json', '', '')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        assert!(matches!(
            store.list("c").await.unwrap_err(),
            AppError::Internal(_)
        ));
        assert!(matches!(
            store
                .set("c", "bad", json!({ "v": 1 }))
                .await
                .unwrap_err(),
            AppError::Internal(_)
        ));
    }
}
