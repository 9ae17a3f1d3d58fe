//! One-off maintenance tasks run from the `cms` binary.

pub mod placeholders;
pub mod provision;

pub use placeholders::{cleanup_placeholders, is_placeholder_url, CleanupItem, CleanupReport, PLACEHOLDER_HOSTS};
pub use provision::{create_admin, ProvisionError};
