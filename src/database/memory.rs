use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::store::{compare_values, Direction, Document, DocumentQuery, DocumentStore};

/// Process-local document store. Insertion order is kept per collection.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, collection: &str, query: &DocumentQuery) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| query.matches(&d.data)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            // Stable sort keeps insertion order among equal keys.
            docs.sort_by(|a, b| {
                let ordering = compare_values(a.data.get(&order.field), b.data.get(&order.field));
                match order.direction {
                    Direction::Asc => ordering,
                    // Nulls stay last in both directions.
                    Direction::Desc => match (a.data.get(&order.field), b.data.get(&order.field)) {
                        (None | Some(Value::Null), _) | (_, None | Some(Value::Null)) => ordering,
                        _ => ordering.reverse(),
                    },
                }
            });
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn insert(&self, collection: &str, data: Map<String, Value>) -> Result<Document, DatabaseError> {
        let doc = Document {
            id: Uuid::new_v4().simple().to_string(),
            data,
        };
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default().push(doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Document>, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(None);
        };

        for (key, value) in data {
            doc.data.insert(key, value);
        }
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn orders_filters_and_limits() {
        let store = MemoryDocumentStore::new();
        store.insert("news", object(json!({"title": "a", "date": "2024-01-10"}))).await.unwrap();
        store.insert("news", object(json!({"title": "b", "date": "2024-03-01"}))).await.unwrap();
        store.insert("news", object(json!({"title": "c"}))).await.unwrap();
        store.insert("news", object(json!({"title": "d", "date": "2023-06-15"}))).await.unwrap();

        let query = DocumentQuery::new().order_by("date", Direction::Desc).limit(Some(3));
        let titles: Vec<_> = store
            .query("news", &query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.data["title"].clone())
            .collect();
        assert_eq!(titles, vec![json!("b"), json!("a"), json!("d")]);

        let query = DocumentQuery::new().where_eq("title", "c");
        assert_eq!(store.query("news", &query).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_collection_yields_empty_vec() {
        let store = MemoryDocumentStore::new();
        let docs = store.query("press", &DocumentQuery::new()).await.unwrap();
        assert!(docs.is_empty());
        assert!(store.get("press", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_and_delete_removes() {
        let store = MemoryDocumentStore::new();
        let doc = store
            .insert("board", object(json!({"name": "Ada", "role": "Chair"})))
            .await
            .unwrap();

        let updated = store
            .update("board", &doc.id, object(json!({"role": "Treasurer"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.data["name"], json!("Ada"));
        assert_eq!(updated.data["role"], json!("Treasurer"));

        assert!(store.update("board", "missing", Map::new()).await.unwrap().is_none());
        assert!(store.delete("board", &doc.id).await.unwrap());
        assert!(!store.delete("board", &doc.id).await.unwrap());
    }
}
