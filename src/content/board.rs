use crate::database::DocumentStore;

use super::{find, list, BoardMember, Collection};

/// Board members by their explicit display order.
pub async fn members(store: &dyn DocumentStore) -> Vec<BoardMember> {
    list(store, Collection::Board, Collection::Board.default_query()).await
}

pub async fn by_id(store: &dyn DocumentStore, id: &str) -> Option<BoardMember> {
    find(store, Collection::Board, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::object;
    use crate::database::MemoryDocumentStore;
    use serde_json::json;

    #[tokio::test]
    async fn ordered_by_order_field() {
        let store = MemoryDocumentStore::new();
        store.insert("board", object(json!({"name": "Treasurer", "order": 3}))).await.unwrap();
        store.insert("board", object(json!({"name": "President", "order": 1}))).await.unwrap();
        store.insert("board", object(json!({"name": "Secretary", "order": 2}))).await.unwrap();

        let names: Vec<_> = members(&store).await.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["President", "Secretary", "Treasurer"]);
    }
}
