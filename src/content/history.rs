use crate::database::DocumentStore;

use super::{find, list, Collection, HistoryEvent};

/// Milestones, oldest first.
pub async fn timeline(store: &dyn DocumentStore) -> Vec<HistoryEvent> {
    list(store, Collection::History, Collection::History.default_query()).await
}

pub async fn by_id(store: &dyn DocumentStore, id: &str) -> Option<HistoryEvent> {
    find(store, Collection::History, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::object;
    use crate::database::MemoryDocumentStore;
    use serde_json::json;

    #[tokio::test]
    async fn ordered_by_year() {
        let store = MemoryDocumentStore::new();
        store.insert("history", object(json!({"year": 1998, "title": "First festival"}))).await.unwrap();
        store.insert("history", object(json!({"year": 1975, "title": "Founded"}))).await.unwrap();

        let years: Vec<_> = timeline(&store).await.into_iter().map(|e| e.year).collect();
        assert_eq!(years, vec![1975, 1998]);
    }
}
