use serde::{Deserialize, Serialize};

/// OAuth2 password-grant form for `POST /login`. Extra grant fields such as
/// `grant_type` or `scope` are accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Bearer token issued after a successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub token: String,
}

/// Form body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default, alias = "name")]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Form body for `POST /auth/reset_password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub new_password: String,
}

/// First 20 characters of a token followed by `...`.
pub fn truncate_token(token: &str) -> String {
    let head: String = token.chars().take(20).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_shape() {
        let json = serde_json::to_value(TokenResponse::bearer("abc".into())).unwrap();
        assert_eq!(json["access_token"], "abc");
        assert_eq!(json["token_type"], "bearer");
    }

    #[test]
    fn truncates_long_tokens() {
        assert_eq!(truncate_token("abcdefghijklmnopqrstuvwxyz"), "abcdefghijklmnopqrst...");
        assert_eq!(truncate_token("short"), "short...");
    }

    #[test]
    fn login_form_ignores_grant_fields() {
        let form: LoginRequest = serde_json::from_str(
            r#"{"grant_type":"password","username":"ann","password":"pw","scope":""}"#,
        )
        .unwrap();
        assert_eq!(form.username, "ann");
    }
}
