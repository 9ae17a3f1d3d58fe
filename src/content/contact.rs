use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::database::DocumentStore;

use super::{create_document, find, list, update_document, Collection, ContactMessage, ContactSubmission};

/// Store a message from the public contact form.
pub async fn submit(store: &dyn DocumentStore, submission: ContactSubmission) -> Option<ContactMessage> {
    let mut data = Map::new();
    data.insert("name".into(), Value::String(submission.name.trim().to_string()));
    data.insert("email".into(), Value::String(submission.email.trim().to_string()));
    data.insert("subject".into(), json!(submission.subject));
    data.insert("message".into(), Value::String(submission.message));
    data.insert("created_at".into(), json!(Utc::now()));
    data.insert("read".into(), Value::Bool(false));

    let doc = create_document(store, Collection::Contact, data).await?;
    super::map_document(Collection::Contact.name(), doc)
}

/// Received messages, newest first.
pub async fn inbox(store: &dyn DocumentStore, limit: Option<usize>) -> Vec<ContactMessage> {
    list(store, Collection::Contact, Collection::Contact.default_query().limit(limit)).await
}

pub async fn by_id(store: &dyn DocumentStore, id: &str) -> Option<ContactMessage> {
    find(store, Collection::Contact, id).await
}

pub async fn mark_read(store: &dyn DocumentStore, id: &str) -> bool {
    let mut data = Map::new();
    data.insert("read".into(), Value::Bool(true));
    update_document(store, Collection::Contact, id, data).await.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDocumentStore;

    #[tokio::test]
    async fn submitted_messages_land_unread_in_inbox() {
        let store = MemoryDocumentStore::new();
        let message = submit(
            &store,
            ContactSubmission {
                name: " Grace ".into(),
                email: "grace@example.org".into(),
                subject: Some("Membership".into()),
                message: "How do I join?".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(message.name, "Grace");
        assert!(!message.read);

        assert!(mark_read(&store, &message.id).await);
        assert!(by_id(&store, &message.id).await.unwrap().read);
        assert!(!mark_read(&store, "missing").await);
        assert_eq!(inbox(&store, None).await.len(), 1);
    }
}
