use crate::database::DocumentStore;

use super::{find, list, Collection, PressArticle};

/// Press coverage, newest first.
pub async fn latest(store: &dyn DocumentStore, limit: Option<usize>) -> Vec<PressArticle> {
    list(store, Collection::Press, Collection::Press.default_query().limit(limit)).await
}

pub async fn by_id(store: &dyn DocumentStore, id: &str) -> Option<PressArticle> {
    find(store, Collection::Press, id).await
}
