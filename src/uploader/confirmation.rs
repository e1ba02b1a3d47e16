use serde::Deserialize;

use crate::errors::{AppError, AppResult};
use crate::profile::UserProfileState;
use crate::security::InputValidator;

/// Body the upload endpoint returns on success.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadConfirmation {
    updated_user: UserProfileState,
}

/// A confirmed record together with the avatar URL it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedUpload {
    pub remote_url: String,
    pub record: UserProfileState,
}

/// Validates a success body. Anything that does not carry a usable avatar
/// reference is treated as a rejection.
pub fn parse_confirmation(body: &str) -> AppResult<ConfirmedUpload> {
    let confirmation: UploadConfirmation = serde_json::from_str(body).map_err(|e| {
        log::error!("Upload response does not match the confirmation contract: {}", e);
        AppError::server_rejection(None, format!("malformed confirmation: {}", e))
    })?;

    let record = confirmation.updated_user;
    let remote_url = record
        .avatar
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    InputValidator::validate_avatar_url(&remote_url)
        .map_err(|e| AppError::server_rejection(None, format!("unusable avatar reference: {}", e)))?;

    Ok(ConfirmedUpload { remote_url, record })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_confirmation() {
        let body = r#"{"updatedUser":{"id":"u1","avatar":"https://cdn/x/cat.png","displayName":"Ada"}}"#;
        let confirmed = parse_confirmation(body).unwrap();
        assert_eq!(confirmed.remote_url, "https://cdn/x/cat.png");
        assert_eq!(confirmed.record.display_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_missing_avatar_is_rejection() {
        let err = parse_confirmation(r#"{"updatedUser":{"id":"u1"}}"#).unwrap_err();
        assert!(matches!(err, AppError::ServerRejection { status: None, .. }));
    }

    #[test]
    fn test_local_reference_is_rejection() {
        let body = r#"{"updatedUser":{"avatar":"data:image/png;base64,AAAA"}}"#;
        assert!(matches!(
            parse_confirmation(body),
            Err(AppError::ServerRejection { .. })
        ));
    }

    #[test]
    fn test_wrong_shape_is_rejection() {
        assert!(matches!(
            parse_confirmation(r#"{"user":{"avatar":"https://cdn/a.png"}}"#),
            Err(AppError::ServerRejection { .. })
        ));
        assert!(matches!(
            parse_confirmation("<html>gateway</html>"),
            Err(AppError::ServerRejection { .. })
        ));
    }
}
