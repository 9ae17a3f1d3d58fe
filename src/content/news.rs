use crate::database::{Direction, DocumentQuery, DocumentStore};

use super::{find, find_one, list, Collection, NewsArticle};

/// Published articles, newest first.
pub async fn latest(store: &dyn DocumentStore, limit: Option<usize>) -> Vec<NewsArticle> {
    let query = DocumentQuery::new()
        .where_eq("published", true)
        .order_by("date", Direction::Desc)
        .limit(limit);
    list(store, Collection::News, query).await
}

/// Every article including drafts, newest first.
pub async fn all(store: &dyn DocumentStore) -> Vec<NewsArticle> {
    list(store, Collection::News, Collection::News.default_query()).await
}

pub async fn by_slug(store: &dyn DocumentStore, slug: &str) -> Option<NewsArticle> {
    let query = DocumentQuery::new().where_eq("slug", slug);
    find_one(store, Collection::News, query).await
}

pub async fn by_id(store: &dyn DocumentStore, id: &str) -> Option<NewsArticle> {
    find(store, Collection::News, id).await
}
