use crate::database::{Direction, DocumentQuery, DocumentStore};

use super::{find, list, Collection, GalleryImage};

pub async fn images(store: &dyn DocumentStore, limit: Option<usize>) -> Vec<GalleryImage> {
    list(store, Collection::Gallery, Collection::Gallery.default_query().limit(limit)).await
}

pub async fn by_category(store: &dyn DocumentStore, category: &str, limit: Option<usize>) -> Vec<GalleryImage> {
    let query = DocumentQuery::new()
        .where_eq("category", category)
        .order_by("date", Direction::Desc)
        .limit(limit);
    list(store, Collection::Gallery, query).await
}

pub async fn by_id(store: &dyn DocumentStore, id: &str) -> Option<GalleryImage> {
    find(store, Collection::Gallery, id).await
}
