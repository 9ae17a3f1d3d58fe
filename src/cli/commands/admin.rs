use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DocumentStore;
use crate::maintenance::create_admin;

pub async fn handle(
    store: &dyn DocumentStore,
    email: &str,
    password: &str,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let account = create_admin(store, email, password).await?;

    output_success(
        &output_format,
        &format!("Admin account '{}' created", account.email),
        Some(json!({ "admin": account })),
    )
}
