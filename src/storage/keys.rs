//! Storage key layout: `<prefix>/<unix-millis>_<sanitized name>`.

use chrono::Utc;

const DEFAULT_PREFIX: &str = "misc";

/// Build a fresh key for `file_name` under `prefix`.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    object_key_at(prefix, file_name, Utc::now().timestamp_millis())
}

pub fn object_key_at(prefix: &str, file_name: &str, millis: i64) -> String {
    format!("{}/{}_{}", sanitize_prefix(prefix), millis, sanitize_name(file_name))
}

/// Keep ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
/// Directory components of the name are dropped.
pub fn sanitize_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Normalize a caller-supplied prefix into `/`-joined clean segments.
pub fn sanitize_prefix(prefix: &str) -> String {
    let segments: Vec<String> = prefix
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(|s| {
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') { c } else { '_' })
                .collect()
        })
        .collect();
    if segments.is_empty() {
        DEFAULT_PREFIX.to_string()
    } else {
        segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_combines_prefix_time_and_name() {
        assert_eq!(
            object_key_at("gallery", "Summer Fest.JPG", 1_700_000_000_000),
            "gallery/1700000000000_Summer_Fest.JPG"
        );
    }

    #[test]
    fn traversal_is_neutralized() {
        assert_eq!(sanitize_prefix("../../etc"), "etc");
        assert_eq!(sanitize_prefix("/news//2024/"), "news/2024");
        assert_eq!(sanitize_prefix(""), "misc");
        assert_eq!(sanitize_name("../../passwd"), "passwd");
        assert_eq!(sanitize_name("C:\\photos\\me.png"), "me.png");
        assert_eq!(sanitize_name(".."), "file");
    }
}
