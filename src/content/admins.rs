use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::database::{DocumentQuery, DocumentStore};

use super::{create_document, find_one, map_document, AdminAccount, Collection};

pub async fn by_email(store: &dyn DocumentStore, email: &str) -> Option<AdminAccount> {
    let query = DocumentQuery::new().where_eq("email", normalize_email(email));
    find_one(store, Collection::Admins, query).await
}

pub async fn create(store: &dyn DocumentStore, email: &str, password_hash: String) -> Option<AdminAccount> {
    let mut data = Map::new();
    data.insert("email".into(), Value::String(normalize_email(email)));
    data.insert("password_hash".into(), Value::String(password_hash));
    data.insert("created_at".into(), json!(Utc::now()));

    let doc = create_document(store, Collection::Admins, data).await?;
    map_document(Collection::Admins.name(), doc)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
