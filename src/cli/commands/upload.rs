use anyhow::Context;
use reqwest::header::SET_COOKIE;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::utils::{output_success, output_warning};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::content::Collection;
use crate::identity::Subject;
use crate::storage::sanitize_prefix;
use crate::upload::{content_type_from_name, FallbackMode, HttpTransport, UploadAdapter, UploadFile, UploadOutcome, UploadPolicy};

pub struct UploadArgs {
    pub file: PathBuf,
    pub path: String,
    pub server: String,
    pub email: String,
    pub password: String,
    pub allow_fallback: bool,
}

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    data: LoginData,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    subject: Subject,
}

/// Sign in and return the subject plus the `name=value` cookie pair.
async fn login(client: &reqwest::Client, server: &str, email: &str, password: &str) -> anyhow::Result<(Subject, String)> {
    let response = client
        .post(format!("{}/auth/login", server))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .with_context(|| format!("Could not reach {}", server))?;

    if !response.status().is_success() {
        anyhow::bail!("Sign-in failed with status {}", response.status());
    }

    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
        .context("Server did not set a session cookie")?;

    let body: LoginEnvelope = response.json().await.context("Unexpected sign-in response")?;
    Ok((body.data.subject, cookie))
}

pub async fn handle(args: UploadArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Could not read {}", args.file.display()))?;
    let name = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();
    let file = UploadFile::new(name.clone(), content_type_from_name(&name), bytes);

    let server = args.server.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();
    let (subject, cookie) = login(&client, &server, &args.email, &args.password).await?;

    let prefix = sanitize_prefix(&args.path);
    let upload_config = &config().upload;
    let policy = match prefix.split('/').next().and_then(Collection::from_managed) {
        Some(collection) => UploadPolicy::for_collection(collection, upload_config),
        None => UploadPolicy::images(upload_config.image_max_bytes),
    };
    let fallback = if args.allow_fallback {
        FallbackMode::Enabled {
            max_bytes: upload_config.fallback_max_bytes,
        }
    } else {
        FallbackMode::Disabled
    };

    let transport = HttpTransport::new(client, server).with_cookie(cookie);
    let adapter = UploadAdapter::new(Arc::new(transport), fallback);

    match adapter.upload(Some(&file), &prefix, Some(&subject), &policy).await {
        UploadOutcome::Succeeded {
            transport,
            url,
            storage_path,
            warning,
        } => {
            if let Some(warning) = &warning {
                output_warning(&output_format, warning);
            }
            let shown = if url.chars().count() > 80 {
                format!("{}...", url.chars().take(80).collect::<String>())
            } else {
                url.clone()
            };
            output_success(
                &output_format,
                &format!("Uploaded {} as {}", name, shown),
                Some(json!({
                    "url": url,
                    "storage_path": storage_path,
                    "transport": transport,
                    "warning": warning,
                })),
            )
        }
        UploadOutcome::Rejected { reason } => Err(anyhow::anyhow!("{} ({})", reason, reason.code())),
    }
}
