//! Password-reset deep-link parsing.
//!
//! The reset email links into the app with `token` and `email` query
//! parameters, which pre-fill the reset-password screen.

use thiserror::Error;
use url::Url;

/// Errors raised when parsing a deep link.
#[derive(Debug, Error)]
pub enum DeepLinkError {
    /// The link is not a valid URL.
    #[error("invalid link: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A required query parameter is absent or empty.
    #[error("link is missing the '{0}' parameter")]
    MissingParam(&'static str),
}

/// Parameters carried by a password-reset link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetPasswordLink {
    /// One-time reset token, sent as the bearer credential on the update.
    pub token: String,
    /// The account email the reset was requested for.
    pub email: String,
}

/// Parse a password-reset deep link.
///
/// # Errors
///
/// Returns a [`DeepLinkError`] if the URL does not parse or either the
/// `token` or `email` parameter is absent or empty.
pub fn parse_reset_password_link(raw: &str) -> Result<ResetPasswordLink, DeepLinkError> {
    let url = Url::parse(raw)?;

    let mut token = None;
    let mut email = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "token" => token = Some(value.into_owned()),
            "email" => email = Some(value.into_owned()),
            _ => {}
        }
    }

    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(DeepLinkError::MissingParam("token"))?;
    let email = email
        .filter(|e| !e.is_empty())
        .ok_or(DeepLinkError::MissingParam("email"))?;

    Ok(ResetPasswordLink { token, email })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_link() {
        let link = parse_reset_password_link(
            "brambleapp://reset-password?token=tok_123&email=user%40example.com",
        )
        .expect("valid link");
        assert_eq!(link.token, "tok_123");
        assert_eq!(link.email, "user@example.com");
    }

    #[test]
    fn test_parse_https_link() {
        let link =
            parse_reset_password_link("https://shop.test/reset?email=a@b.co&token=t1&extra=x")
                .expect("valid link");
        assert_eq!(link.token, "t1");
        assert_eq!(link.email, "a@b.co");
    }

    #[test]
    fn test_parse_missing_token() {
        let result = parse_reset_password_link("brambleapp://reset-password?email=a@b.co");
        assert!(matches!(result, Err(DeepLinkError::MissingParam("token"))));
    }

    #[test]
    fn test_parse_empty_email() {
        let result = parse_reset_password_link("brambleapp://reset-password?token=t&email=");
        assert!(matches!(result, Err(DeepLinkError::MissingParam("email"))));
    }

    #[test]
    fn test_parse_invalid_url() {
        let result = parse_reset_password_link("not a url at all");
        assert!(matches!(result, Err(DeepLinkError::InvalidUrl(_))));
    }
}
