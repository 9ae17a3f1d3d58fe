use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::store::{is_valid_identifier, Direction, Document, DocumentQuery, DocumentStore};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        data JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (collection, id)
    )
"#;

/// Document store over a single `documents` table with a JSONB payload.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents (collection, created_at)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn check_collection(collection: &str) -> Result<(), DatabaseError> {
        if is_valid_identifier(collection) {
            Ok(())
        } else {
            Err(DatabaseError::InvalidIdentifier(collection.to_string()))
        }
    }

    fn row_to_document(row: PgRow) -> Result<Document, DatabaseError> {
        let id: String = row.try_get("id")?;
        let Json(data): Json<Value> = row.try_get("data")?;
        match data {
            Value::Object(data) => Ok(Document { id, data }),
            other => Err(DatabaseError::QueryError(format!(
                "document {} holds a non-object payload: {}",
                id, other
            ))),
        }
    }
}

/// Oversized limits saturate instead of wrapping negative.
fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Builds the filtered, ordered SELECT for one collection.
///
/// A JSON `null` order value is folded into SQL NULL so it sorts last in
/// both directions, matching the in-memory store.
fn select_query<'a>(collection: &'a str, query: &DocumentQuery) -> Result<QueryBuilder<'a, Postgres>, DatabaseError> {
    PgDocumentStore::check_collection(collection)?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT id, data FROM documents WHERE collection = ");
    builder.push_bind(collection);

    for (field, value) in &query.filters {
        if !is_valid_identifier(field) {
            return Err(DatabaseError::InvalidIdentifier(field.clone()));
        }
        builder.push(" AND data -> ");
        builder.push_bind(field.clone());
        builder.push(" = ");
        builder.push_bind(Json(value.clone()));
    }

    match &query.order {
        Some(order) => {
            if !is_valid_identifier(&order.field) {
                return Err(DatabaseError::InvalidIdentifier(order.field.clone()));
            }
            builder.push(" ORDER BY NULLIF(data -> ");
            builder.push_bind(order.field.clone());
            builder.push(", 'null'::jsonb)");
            builder.push(match order.direction {
                Direction::Asc => " ASC NULLS LAST",
                Direction::Desc => " DESC NULLS LAST",
            });
            builder.push(", created_at ASC");
        }
        None => {
            builder.push(" ORDER BY created_at ASC");
        }
    }

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit_param(limit));
    }

    Ok(builder)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn query(&self, collection: &str, query: &DocumentQuery) -> Result<Vec<Document>, DatabaseError> {
        let mut builder = select_query(collection, query)?;
        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        Self::check_collection(collection)?;
        let row = sqlx::query("SELECT id, data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_document).transpose()
    }

    async fn insert(&self, collection: &str, data: Map<String, Value>) -> Result<Document, DatabaseError> {
        Self::check_collection(collection)?;
        let id = Uuid::new_v4().simple().to_string();
        let row = sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3) RETURNING id, data")
            .bind(collection)
            .bind(&id)
            .bind(Json(Value::Object(data)))
            .fetch_one(&self.pool)
            .await?;
        Self::row_to_document(row)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Document>, DatabaseError> {
        Self::check_collection(collection)?;
        let row = sqlx::query(
            "UPDATE documents SET data = data || $3, updated_at = now() \
             WHERE collection = $1 AND id = $2 RETURNING id, data",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(data)))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_document).transpose()
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DatabaseError> {
        Self::check_collection(collection)?;
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
