use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::UploadConfig;
use crate::identity::Subject;

use super::data_uri;
use super::policy::{InvalidFile, UploadPolicy};
use super::transport::{PrimaryTransport, TransportError};
use super::UploadFile;

pub const FALLBACK_WARNING: &str = "The image could not be sent to storage and was embedded inline instead. \
     It is not stored durably; upload it again once storage is reachable.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    Enabled { max_bytes: usize },
    Disabled,
}

impl FallbackMode {
    pub fn from_config(config: &UploadConfig) -> Self {
        if config.allow_fallback {
            FallbackMode::Enabled {
                max_bytes: config.fallback_max_bytes,
            }
        } else {
            FallbackMode::Disabled
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("{0}")]
    InvalidFile(InvalidFile),

    #[error("You must be signed in to upload files")]
    Unauthenticated,

    #[error("Upload failed: {message} ({code})")]
    PrimaryTransport { code: String, message: String },

    #[error("Upload failed ({primary}) and the inline fallback was not possible: {reason}")]
    FallbackFailed { primary: TransportError, reason: String },
}

impl UploadRejection {
    pub fn code(&self) -> &'static str {
        match self {
            UploadRejection::InvalidFile(invalid) => invalid.code(),
            UploadRejection::Unauthenticated => "UNAUTHENTICATED",
            UploadRejection::PrimaryTransport { .. } => "UPLOAD_FAILED",
            UploadRejection::FallbackFailed { .. } => "FALLBACK_FAILED",
        }
    }
}

/// Terminal result of one upload attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Succeeded {
        transport: Transport,
        url: String,
        /// Only set when a durable object was written.
        storage_path: Option<String>,
        warning: Option<String>,
    },
    Rejected {
        reason: UploadRejection,
    },
}

impl UploadOutcome {
    /// Produced by the fallback path: the locator is not durable.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            UploadOutcome::Succeeded {
                transport: Transport::Fallback,
                ..
            }
        )
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            UploadOutcome::Succeeded { url, .. } => Some(url),
            UploadOutcome::Rejected { .. } => None,
        }
    }

    pub fn rejection(&self) -> Option<&UploadRejection> {
        match self {
            UploadOutcome::Rejected { reason } => Some(reason),
            UploadOutcome::Succeeded { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Idle,
    Validating,
    Rejected,
    Transferring,
    FallingBack,
    Succeeded(Transport),
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Rejected | UploadState::Succeeded(_))
    }

    pub fn can_transition_to(&self, next: &UploadState) -> bool {
        use UploadState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Rejected)
                | (Validating, Transferring)
                | (Transferring, Succeeded(Transport::Primary))
                | (Transferring, FallingBack)
                | (FallingBack, Succeeded(Transport::Fallback))
                | (FallingBack, Rejected)
        )
    }
}

/// States visited by one attempt, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadAttempt {
    states: Vec<UploadState>,
}

impl Default for UploadAttempt {
    fn default() -> Self {
        Self {
            states: vec![UploadState::Idle],
        }
    }
}

impl UploadAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> UploadState {
        self.states.last().copied().unwrap_or(UploadState::Idle)
    }

    pub fn states(&self) -> &[UploadState] {
        &self.states
    }

    /// Move to `next` if the transition is legal. Returns whether it moved.
    pub fn advance(&mut self, next: UploadState) -> bool {
        let current = self.state();
        if !current.can_transition_to(&next) {
            tracing::warn!(from = ?current, to = ?next, "Refusing illegal upload state transition");
            return false;
        }
        self.states.push(next);
        true
    }

    fn reject(&mut self, reason: UploadRejection) -> UploadOutcome {
        self.advance(UploadState::Rejected);
        UploadOutcome::Rejected { reason }
    }
}

/// Validation, primary transfer and inline fallback for image uploads.
#[derive(Clone)]
pub struct UploadAdapter {
    primary: Arc<dyn PrimaryTransport>,
    fallback: FallbackMode,
}

impl UploadAdapter {
    pub fn new(primary: Arc<dyn PrimaryTransport>, fallback: FallbackMode) -> Self {
        Self { primary, fallback }
    }

    pub fn from_config(primary: Arc<dyn PrimaryTransport>, config: &UploadConfig) -> Self {
        Self::new(primary, FallbackMode::from_config(config))
    }

    pub fn fallback(&self) -> FallbackMode {
        self.fallback
    }

    pub async fn upload(
        &self,
        file: Option<&UploadFile>,
        prefix: &str,
        actor: Option<&Subject>,
        policy: &UploadPolicy,
    ) -> UploadOutcome {
        self.run(&mut UploadAttempt::new(), file, prefix, actor, policy).await
    }

    /// Like [`UploadAdapter::upload`], also returning the visited states.
    pub async fn upload_traced(
        &self,
        file: Option<&UploadFile>,
        prefix: &str,
        actor: Option<&Subject>,
        policy: &UploadPolicy,
    ) -> (UploadOutcome, UploadAttempt) {
        let mut attempt = UploadAttempt::new();
        let outcome = self.run(&mut attempt, file, prefix, actor, policy).await;
        (outcome, attempt)
    }

    async fn run(
        &self,
        attempt: &mut UploadAttempt,
        file: Option<&UploadFile>,
        prefix: &str,
        actor: Option<&Subject>,
        policy: &UploadPolicy,
    ) -> UploadOutcome {
        attempt.advance(UploadState::Validating);

        let file = match UploadPolicy::check_present(file) {
            Ok(file) => file,
            Err(invalid) => return attempt.reject(UploadRejection::InvalidFile(invalid)),
        };
        let Some(actor) = actor else {
            tracing::warn!(file_name = %file.name, "Upload refused without a signed-in session");
            return attempt.reject(UploadRejection::Unauthenticated);
        };
        if let Err(invalid) = policy.check_content(file) {
            tracing::info!(
                file_name = %file.name,
                size_bytes = file.size(),
                content_type = %file.content_type,
                reason = %invalid,
                "Upload rejected by validation"
            );
            return attempt.reject(UploadRejection::InvalidFile(invalid));
        }

        attempt.advance(UploadState::Transferring);
        let primary_error = match self.primary.transfer(file, prefix).await {
            Ok(stored) => {
                attempt.advance(UploadState::Succeeded(Transport::Primary));
                tracing::info!(
                    actor = %actor.email,
                    transport = self.primary.name(),
                    path = %stored.path,
                    size_bytes = file.size(),
                    "Upload stored"
                );
                return UploadOutcome::Succeeded {
                    transport: Transport::Primary,
                    url: stored.url,
                    storage_path: Some(stored.path).filter(|p| !p.is_empty()),
                    warning: None,
                };
            }
            Err(e) => e,
        };

        tracing::error!(
            actor = %actor.email,
            transport = self.primary.name(),
            code = %primary_error.code,
            error = %primary_error.message,
            "Primary upload transport failed"
        );
        attempt.advance(UploadState::FallingBack);

        let max_bytes = match self.fallback {
            FallbackMode::Enabled { max_bytes } => max_bytes,
            FallbackMode::Disabled => {
                return attempt.reject(UploadRejection::PrimaryTransport {
                    code: primary_error.code,
                    message: primary_error.message,
                });
            }
        };

        if file.size() > max_bytes {
            return attempt.reject(UploadRejection::FallbackFailed {
                primary: primary_error,
                reason: format!("file exceeds the {} byte inline limit", max_bytes),
            });
        }
        let Some(url) = data_uri::encode(&file.content_type, &file.bytes) else {
            return attempt.reject(UploadRejection::FallbackFailed {
                primary: primary_error,
                reason: format!("'{}' cannot be embedded inline", file.content_type),
            });
        };

        attempt.advance(UploadState::Succeeded(Transport::Fallback));
        tracing::warn!(
            actor = %actor.email,
            file_name = %file.name,
            size_bytes = file.size(),
            "Upload degraded to inline data URI"
        );
        UploadOutcome::Succeeded {
            transport: Transport::Fallback,
            url,
            storage_path: None,
            warning: Some(FALLBACK_WARNING.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ObjectStorage, StoredObject};
    use crate::upload::StorageTransport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MIB: usize = 1024 * 1024;

    /// Counts calls and fails with the given error, or succeeds when `None`.
    struct ScriptedTransport {
        calls: AtomicUsize,
        error: Option<TransportError>,
    }

    impl ScriptedTransport {
        fn failing(code: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                error: Some(TransportError::new(code, "Internal Server Error")),
            })
        }

        fn working() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                error: None,
            })
        }
    }

    #[async_trait]
    impl PrimaryTransport for ScriptedTransport {
        async fn transfer(&self, file: &UploadFile, prefix: &str) -> Result<StoredObject, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.error {
                Some(e) => Err(e.clone()),
                None => Ok(StoredObject {
                    url: format!("https://cdn.example/{}/{}", prefix, file.name),
                    path: format!("{}/{}", prefix, file.name),
                }),
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn admin() -> Subject {
        Subject {
            id: "a1".into(),
            email: "board@example.org".into(),
        }
    }

    fn jpeg(size: usize) -> UploadFile {
        UploadFile::new("photo.jpg", "image/jpeg", vec![0xffu8; size])
    }

    fn enabled() -> FallbackMode {
        FallbackMode::Enabled { max_bytes: 10 * MIB }
    }

    #[tokio::test]
    async fn oversized_file_never_reaches_transport() {
        let transport = ScriptedTransport::working();
        let adapter = UploadAdapter::new(transport.clone(), enabled());

        let (outcome, attempt) = adapter
            .upload_traced(Some(&jpeg(6 * MIB)), "news", Some(&admin()), &UploadPolicy::images(5 * MIB))
            .await;

        let reason = outcome.rejection().unwrap();
        assert!(matches!(reason, UploadRejection::InvalidFile(InvalidFile::Size { .. })));
        assert!(reason.to_string().contains("Maximum size is 5 MB"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            attempt.states(),
            &[UploadState::Idle, UploadState::Validating, UploadState::Rejected]
        );
    }

    #[tokio::test]
    async fn primary_failure_degrades_to_data_uri() {
        let transport = ScriptedTransport::failing("http/500");
        let adapter = UploadAdapter::new(transport.clone(), enabled());

        let (outcome, attempt) = adapter
            .upload_traced(Some(&jpeg(2 * MIB)), "news", Some(&admin()), &UploadPolicy::images(5 * MIB))
            .await;

        assert!(outcome.is_degraded());
        assert!(outcome.url().unwrap().starts_with("data:image/jpeg;base64,"));
        match &outcome {
            UploadOutcome::Succeeded {
                storage_path, warning, ..
            } => {
                assert!(storage_path.is_none());
                assert!(warning.is_some());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(attempt.state(), UploadState::Succeeded(Transport::Fallback));
    }

    #[tokio::test]
    async fn signed_out_actor_is_rejected_before_transfer() {
        let transport = ScriptedTransport::working();
        let adapter = UploadAdapter::new(transport.clone(), enabled());
        let outcome = adapter
            .upload(Some(&jpeg(10)), "news", None, &UploadPolicy::images(MIB))
            .await;
        assert_eq!(outcome.rejection(), Some(&UploadRejection::Unauthenticated));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disabled_fallback_surfaces_provider_code() {
        let adapter = UploadAdapter::new(ScriptedTransport::failing("storage/unauthorized"), FallbackMode::Disabled);
        let outcome = adapter
            .upload(Some(&jpeg(10)), "board", Some(&admin()), &UploadPolicy::images(MIB))
            .await;
        match outcome.rejection() {
            Some(UploadRejection::PrimaryTransport { code, .. }) => assert_eq!(code, "storage/unauthorized"),
            other => panic!("unexpected rejection {:?}", other),
        }
    }

    #[tokio::test]
    async fn fallback_ceiling_is_enforced() {
        let adapter = UploadAdapter::new(
            ScriptedTransport::failing("network"),
            FallbackMode::Enabled { max_bytes: 1024 },
        );
        let (outcome, attempt) = adapter
            .upload_traced(Some(&jpeg(4096)), "gallery", Some(&admin()), &UploadPolicy::images(MIB))
            .await;
        assert!(matches!(outcome.rejection(), Some(UploadRejection::FallbackFailed { .. })));
        assert_eq!(
            attempt.states(),
            &[
                UploadState::Idle,
                UploadState::Validating,
                UploadState::Transferring,
                UploadState::FallingBack,
                UploadState::Rejected
            ]
        );
    }

    #[tokio::test]
    async fn storage_transport_writes_durable_object() {
        let storage = ObjectStorage::memory("http://localhost:3000/media");
        let adapter = UploadAdapter::new(Arc::new(StorageTransport::new(storage.clone())), enabled());

        let outcome = adapter
            .upload(Some(&jpeg(64)), "history", Some(&admin()), &UploadPolicy::images(MIB))
            .await;
        let UploadOutcome::Succeeded {
            transport,
            storage_path: Some(path),
            ..
        } = outcome
        else {
            panic!("expected a durable upload");
        };
        assert_eq!(transport, Transport::Primary);
        assert_eq!(storage.get(&path).await.unwrap().len(), 64);
    }

    #[test]
    fn terminal_states_are_final() {
        let mut attempt = UploadAttempt::new();
        assert!(!attempt.advance(UploadState::Transferring));
        assert!(attempt.advance(UploadState::Validating));
        assert!(attempt.advance(UploadState::Rejected));
        assert!(attempt.state().is_terminal());
        assert!(!attempt.advance(UploadState::Idle));
        assert!(!attempt.advance(UploadState::Transferring));
        assert!(!UploadState::Transferring.can_transition_to(&UploadState::Succeeded(Transport::Fallback)));
    }
}
