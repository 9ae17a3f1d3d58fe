//! Self-contained `data:` locators for the degraded upload path.

use base64::{engine::general_purpose, Engine as _};

use super::policy::essence;

/// `data:<mime>;base64,<payload>`. Returns `None` when the type cannot be embedded.
pub fn encode(content_type: &str, bytes: &[u8]) -> Option<String> {
    let mime = essence(content_type);
    if !is_embeddable(&mime) {
        return None;
    }
    Some(format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes)))
}

/// Only well-formed image types are inlined.
pub fn is_embeddable(mime: &str) -> bool {
    let Some((kind, subtype)) = mime.split_once('/') else {
        return false;
    };
    let token = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
    };
    kind == "image" && token(subtype)
}

pub fn is_data_uri(locator: &str) -> bool {
    locator.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_image_payload() {
        assert_eq!(encode("image/png", b"hi").as_deref(), Some("data:image/png;base64,aGk="));
        assert_eq!(
            encode("Image/SVG+XML; charset=utf-8", b"").as_deref(),
            Some("data:image/svg+xml;base64,")
        );
    }

    #[test]
    fn refuses_non_images() {
        assert!(encode("application/pdf", b"x").is_none());
        assert!(encode("image/we ird", b"x").is_none());
        assert!(encode("garbage", b"x").is_none());
        assert!(is_data_uri("data:image/png;base64,AA=="));
        assert!(!is_data_uri("https://cdn.example/a.png"));
    }
}
