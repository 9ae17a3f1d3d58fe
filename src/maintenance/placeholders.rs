use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::content::{self, Collection};
use crate::database::{DocumentQuery, DocumentStore};

/// Hosts serving stock placeholder images used while the site was drafted.
pub const PLACEHOLDER_HOSTS: &[&str] = &[
    "via.placeholder.com",
    "placehold.co",
    "placehold.it",
    "placeholder.com",
    "dummyimage.com",
    "picsum.photos",
    "placekitten.com",
    "loremflickr.com",
];

pub fn is_placeholder_url(value: &str) -> bool {
    let Ok(url) = Url::parse(value) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    PLACEHOLDER_HOSTS
        .iter()
        .any(|p| host == *p || host.strip_suffix(p).is_some_and(|rest| rest.ends_with('.')))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupItem {
    pub collection: String,
    pub id: String,
    pub url: String,
}

#[derive(Debug, Default, Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub scanned: usize,
    /// Records whose image field was cleared.
    pub cleared: Vec<CleanupItem>,
    /// Gallery records removed outright, since a gallery entry is its image.
    pub deleted: Vec<CleanupItem>,
    pub failed: Vec<CleanupItem>,
}

impl CleanupReport {
    pub fn changed(&self) -> usize {
        self.cleared.len() + self.deleted.len()
    }
}

/// Remove placeholder image URLs from every collection that holds images.
pub async fn cleanup_placeholders(store: &dyn DocumentStore, dry_run: bool) -> CleanupReport {
    let mut report = CleanupReport {
        dry_run,
        ..Default::default()
    };

    for collection in Collection::MANAGED {
        let Some(field) = collection.image_field() else {
            continue;
        };

        let docs = content::list_documents(store, collection, DocumentQuery::new()).await;
        report.scanned += docs.len();

        for doc in docs {
            let Some(url) = doc.data.get(field).and_then(Value::as_str).filter(|u| is_placeholder_url(u)) else {
                continue;
            };
            let item = CleanupItem {
                collection: collection.name().to_string(),
                id: doc.id.clone(),
                url: url.to_string(),
            };

            if dry_run {
                tracing::info!(collection = %collection, id = %doc.id, url = %url, "Would clean placeholder");
                if collection == Collection::Gallery {
                    report.deleted.push(item);
                } else {
                    report.cleared.push(item);
                }
                continue;
            }

            if collection == Collection::Gallery {
                if content::delete_document(store, collection, &doc.id).await {
                    report.deleted.push(item);
                } else {
                    report.failed.push(item);
                }
            } else {
                let mut patch = Map::new();
                patch.insert(field.to_string(), Value::Null);
                match content::update_document(store, collection, &doc.id, patch).await {
                    Some(_) => report.cleared.push(item),
                    None => report.failed.push(item),
                }
            }
        }
    }

    tracing::info!(
        scanned = report.scanned,
        cleared = report.cleared.len(),
        deleted = report.deleted.len(),
        failed = report.failed.len(),
        dry_run,
        "Placeholder cleanup finished"
    );
    report
}
