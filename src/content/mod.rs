//! Data access functions for the association's content collections.
//!
//! Every function here performs one read or one write against one collection
//! and maps the raw documents to a typed shape. Failures are logged and turned
//! into an empty list, `None` or `false`; callers never see an error.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use crate::config::UploadConfig;
use crate::database::{Direction, Document, DocumentQuery, DocumentStore};

pub mod admins;
pub mod board;
pub mod contact;
pub mod gallery;
pub mod history;
pub mod models;
pub mod news;
pub mod press;

pub use models::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    News,
    Press,
    Gallery,
    Board,
    History,
    Contact,
    Admins,
}

impl Collection {
    /// Collections the admin panel may edit.
    pub const MANAGED: [Collection; 6] = [
        Collection::News,
        Collection::Press,
        Collection::Gallery,
        Collection::Board,
        Collection::History,
        Collection::Contact,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::News => "news",
            Collection::Press => "press",
            Collection::Gallery => "gallery",
            Collection::Board => "board",
            Collection::History => "history",
            Collection::Contact => "contact",
            Collection::Admins => "admins",
        }
    }

    /// Resolve a managed collection from a path segment. `admins` is not exposed.
    pub fn from_managed(name: &str) -> Option<Collection> {
        Self::MANAGED.into_iter().find(|c| c.name() == name)
    }

    pub fn default_order(self) -> Option<(&'static str, Direction)> {
        match self {
            Collection::News | Collection::Press | Collection::Gallery => Some(("date", Direction::Desc)),
            Collection::Board => Some(("order", Direction::Asc)),
            Collection::History => Some(("year", Direction::Asc)),
            Collection::Contact => Some(("created_at", Direction::Desc)),
            Collection::Admins => None,
        }
    }

    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Collection::News => &["title", "content"],
            Collection::Press => &["title"],
            Collection::Gallery => &["image_url"],
            Collection::Board => &["name"],
            Collection::History => &["year", "title"],
            Collection::Contact => &["name", "email", "message"],
            Collection::Admins => &["email", "password_hash"],
        }
    }

    /// Field holding the record's image locator, if the collection has one.
    pub fn image_field(self) -> Option<&'static str> {
        match self {
            Collection::News | Collection::Press | Collection::Gallery | Collection::History => Some("image_url"),
            Collection::Board => Some("photo_url"),
            Collection::Contact | Collection::Admins => None,
        }
    }

    /// Storage prefix for images attached to this collection.
    pub fn storage_prefix(self) -> &'static str {
        match self {
            Collection::News => "news",
            Collection::Press => "press",
            Collection::Gallery => "gallery",
            Collection::Board => "board",
            Collection::History => "history",
            Collection::Contact | Collection::Admins => "misc",
        }
    }

    /// Upload ceiling for images attached to this collection.
    pub fn upload_ceiling(self, config: &UploadConfig) -> usize {
        match self {
            Collection::Gallery => config.gallery_max_bytes,
            _ => config.image_max_bytes,
        }
    }

    pub fn default_query(self) -> DocumentQuery {
        match self.default_order() {
            Some((field, direction)) => DocumentQuery::new().order_by(field, direction),
            None => DocumentQuery::new(),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field-level problems with a create or update payload.
pub type FieldErrors = HashMap<String, String>;

/// Check required fields and value types. With `partial`, only the fields present
/// in `data` are checked, for updates.
pub fn validate_fields(collection: Collection, data: &Map<String, Value>, partial: bool) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    for field in collection.required_fields() {
        match data.get(*field) {
            None if partial => {}
            None | Some(Value::Null) => {
                errors.insert(field.to_string(), "This field is required".to_string());
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                errors.insert(field.to_string(), "This field is required".to_string());
            }
            _ => {}
        }
    }

    let numeric = match collection {
        Collection::Board => Some("order"),
        Collection::History => Some("year"),
        _ => None,
    };
    if let Some(field) = numeric {
        if let Some(value) = data.get(field) {
            if !value.is_i64() && !value.is_null() {
                errors.insert(field.to_string(), "Must be a whole number".to_string());
            }
        }
    }

    if collection == Collection::News {
        if let Some(value) = data.get("published") {
            if !value.is_boolean() {
                errors.insert("published".to_string(), "Must be true or false".to_string());
            }
        }
    }

    if collection == Collection::Contact {
        if let Some(Value::String(email)) = data.get("email") {
            if !email.contains('@') {
                errors.insert("email".to_string(), "Invalid email address".to_string());
            }
        }
    }

    if data.contains_key("id") {
        errors.insert("id".to_string(), "The id cannot be set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// URL-friendly slug derived from a title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn map_documents<T: DeserializeOwned>(collection: &str, docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| map_document(collection, doc))
        .collect()
}

fn map_document<T: DeserializeOwned>(collection: &str, doc: Document) -> Option<T> {
    let id = doc.id.clone();
    match serde_json::from_value(doc.into_value()) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(collection, id = %id, error = %e, "Skipping malformed document");
            None
        }
    }
}

pub(crate) async fn list<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    query: DocumentQuery,
) -> Vec<T> {
    map_documents(collection.name(), list_documents(store, collection, query).await)
}

pub(crate) async fn find<T: DeserializeOwned>(store: &dyn DocumentStore, collection: Collection, id: &str) -> Option<T> {
    let doc = get_document(store, collection, id).await?;
    map_document(collection.name(), doc)
}

pub(crate) async fn find_one<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    query: DocumentQuery,
) -> Option<T> {
    list(store, collection, query.limit(Some(1))).await.into_iter().next()
}

/// Raw documents of a collection, for the admin panel.
pub async fn list_documents(store: &dyn DocumentStore, collection: Collection, query: DocumentQuery) -> Vec<Document> {
    match store.query(collection.name(), &query).await {
        Ok(docs) => docs,
        Err(e) => {
            tracing::error!(collection = %collection, error = %e, "Failed to list documents");
            Vec::new()
        }
    }
}

pub async fn get_document(store: &dyn DocumentStore, collection: Collection, id: &str) -> Option<Document> {
    match store.get(collection.name(), id).await {
        Ok(doc) => doc,
        Err(e) => {
            tracing::error!(collection = %collection, id, error = %e, "Failed to fetch document");
            None
        }
    }
}

pub async fn create_document(
    store: &dyn DocumentStore,
    collection: Collection,
    data: Map<String, Value>,
) -> Option<Document> {
    match store.insert(collection.name(), data).await {
        Ok(doc) => {
            tracing::info!(collection = %collection, id = %doc.id, "Document created");
            Some(doc)
        }
        Err(e) => {
            tracing::error!(collection = %collection, error = %e, "Failed to create document");
            None
        }
    }
}

pub async fn update_document(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    data: Map<String, Value>,
) -> Option<Document> {
    match store.update(collection.name(), id, data).await {
        Ok(doc) => doc,
        Err(e) => {
            tracing::error!(collection = %collection, id, error = %e, "Failed to update document");
            None
        }
    }
}

pub async fn delete_document(store: &dyn DocumentStore, collection: Collection, id: &str) -> bool {
    match store.delete(collection.name(), id).await {
        Ok(deleted) => deleted,
        Err(e) => {
            tracing::error!(collection = %collection, id, error = %e, "Failed to delete document");
            false
        }
    }
}
