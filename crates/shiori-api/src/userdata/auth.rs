//! Identity endpoints of the userdata service.
//!
//! The session identity the tracking core consumes comes from here: email +
//! password in, an access token and opaque user id out. Token refresh uses
//! the same endpoint with a different grant type.

use serde::Deserialize;
use url::Url;

use super::error::StoreError;

/// An authenticated session as returned by the identity endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

fn token_url(base_url: &str, grant_type: &str) -> Result<Url, StoreError> {
    let mut url = Url::parse(&format!("{}/auth/v1/token", base_url.trim_end_matches('/')))
        .map_err(|e| StoreError::Auth(e.to_string()))?;
    url.query_pairs_mut().append_pair("grant_type", grant_type);
    Ok(url)
}

async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status,
            message: body,
        })
    }
}

/// Sign in with email and password.
pub async fn sign_in(
    base_url: &str,
    api_key: &str,
    email: &str,
    password: &str,
) -> Result<AuthSession, StoreError> {
    let http = reqwest::Client::new();
    let resp = http
        .post(token_url(base_url, "password")?)
        .header("apikey", api_key)
        .json(&serde_json::json!({
            "email": email,
            "password": password,
        }))
        .send()
        .await?;

    let resp = check_response(resp).await?;
    resp.json()
        .await
        .map_err(|e| StoreError::Parse(e.to_string()))
}

/// Register a new account. Depending on service settings the returned
/// session may require email confirmation before the token is usable.
pub async fn sign_up(
    base_url: &str,
    api_key: &str,
    email: &str,
    password: &str,
) -> Result<AuthSession, StoreError> {
    let http = reqwest::Client::new();
    let resp = http
        .post(format!(
            "{}/auth/v1/signup",
            base_url.trim_end_matches('/')
        ))
        .header("apikey", api_key)
        .json(&serde_json::json!({
            "email": email,
            "password": password,
        }))
        .send()
        .await?;

    let resp = check_response(resp).await?;
    resp.json()
        .await
        .map_err(|e| StoreError::Parse(e.to_string()))
}

/// Exchange a refresh token for a fresh session.
pub async fn refresh(
    base_url: &str,
    api_key: &str,
    refresh_token: &str,
) -> Result<AuthSession, StoreError> {
    let http = reqwest::Client::new();
    let resp = http
        .post(token_url(base_url, "refresh_token")?)
        .header("apikey", api_key)
        .json(&serde_json::json!({
            "refresh_token": refresh_token,
        }))
        .send()
        .await?;

    let resp = check_response(resp).await?;
    resp.json()
        .await
        .map_err(|e| StoreError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url_carries_grant_type() {
        let url = token_url("https://project.example.co/", "password").unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.example.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_session_parses() {
        let json = r#"{
            "access_token": "jwt",
            "refresh_token": "refresh",
            "expires_in": 3600,
            "user": {"id": "user-1", "email": "a@b.c"}
        }"#;
        let session: AuthSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.user.id, "user-1");
        assert_eq!(session.expires_in, Some(3600));
    }
}
