use regex::Regex;
use std::sync::OnceLock;

use crate::errors::{AppError, AppResult};

fn base_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https?://[A-Za-z0-9\-\._~\[\]:]+(/[^\s?#]*)?$").expect("valid base url regex")
    })
}

fn relative_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9\-_\.]+(/[A-Za-z0-9\-_\.]+)*$").expect("valid path regex")
    })
}

fn unsafe_filename_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("valid filename regex"))
}

pub struct InputValidator;

impl InputValidator {
    pub fn validate_base_url(url: &str) -> AppResult<()> {
        let trimmed = url.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("api_base_url", "Base URL cannot be empty"));
        }

        if trimmed.len() > 500 {
            return Err(AppError::validation("api_base_url", "Base URL too long"));
        }

        if !base_url_pattern().is_match(trimmed) {
            return Err(AppError::validation(
                "api_base_url",
                "Must be an http(s) URL without query or fragment",
            ));
        }

        Ok(())
    }

    /// Upload endpoints are relative to the base address.
    pub fn validate_endpoint_path(path: &str) -> AppResult<()> {
        let trimmed = path.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("upload_path", "Path cannot be empty"));
        }

        if trimmed.split('/').any(|segment| segment == "..") {
            return Err(AppError::validation("upload_path", "Invalid path detected"));
        }

        if !relative_path_pattern().is_match(trimmed) {
            return Err(AppError::validation(
                "upload_path",
                "Must be a relative path without leading slash",
            ));
        }

        Ok(())
    }

    /// Checks the avatar reference carried by a confirmed record.
    pub fn validate_avatar_url(url: &str) -> AppResult<()> {
        let trimmed = url.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("avatar", "Avatar URL cannot be empty"));
        }

        if trimmed.starts_with("data:") || trimmed.starts_with("blob:") {
            return Err(AppError::validation(
                "avatar",
                "Avatar must be a remote reference, not a local preview",
            ));
        }

        if !(trimmed.starts_with("https://") || trimmed.starts_with("http://"))
            || trimmed.chars().any(char::is_whitespace)
        {
            return Err(AppError::validation("avatar", "Avatar must be an http(s) URL"));
        }

        Ok(())
    }

    pub fn sanitize_filename(filename: &str) -> String {
        let sanitized = unsafe_filename_chars().replace_all(filename.trim(), "_");

        if sanitized.is_empty() {
            return "upload".to_string();
        }

        if sanitized.chars().count() > 255 {
            let truncated: String = sanitized.chars().take(252).collect();
            format!("{}...", truncated)
        } else {
            sanitized.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_validation() {
        assert!(InputValidator::validate_base_url("http://localhost:8080/api/v1").is_ok());
        assert!(InputValidator::validate_base_url("https://api.example.com").is_ok());
        assert!(InputValidator::validate_base_url("").is_err());
        assert!(InputValidator::validate_base_url("localhost:8080").is_err());
        assert!(InputValidator::validate_base_url("https://example.com/?q=1").is_err());
    }

    #[test]
    fn test_endpoint_path_validation() {
        assert!(InputValidator::validate_endpoint_path("profile/avatar/upload").is_ok());
        assert!(InputValidator::validate_endpoint_path("/profile/avatar").is_err());
        assert!(InputValidator::validate_endpoint_path("profile/../admin").is_err());
        assert!(InputValidator::validate_endpoint_path("https://evil.com/x").is_err());
    }

    #[test]
    fn test_avatar_url_validation() {
        assert!(InputValidator::validate_avatar_url("https://cdn/x/cat.png").is_ok());
        assert!(InputValidator::validate_avatar_url("").is_err());
        assert!(InputValidator::validate_avatar_url("data:image/png;base64,AAAA").is_err());
        assert!(InputValidator::validate_avatar_url("cat.png").is_err());
        assert!(InputValidator::validate_avatar_url("https://cdn/x/a b.png").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        let safe = InputValidator::sanitize_filename("../../etc/passwd<script>.png");
        assert!(!safe.contains('/'));
        assert!(!safe.contains('<'));
        assert_eq!(InputValidator::sanitize_filename("   "), "upload");
        assert_eq!(InputValidator::sanitize_filename("cat.png"), "cat.png");
    }
}
