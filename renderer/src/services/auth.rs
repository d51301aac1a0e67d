use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::RenderError;

#[derive(Serialize)]
struct SigninRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SigninResponse {
    token: String,
}

/// Exchanges credentials for a session token. Any failure here is fatal to
/// the cycle: nothing downstream runs unauthenticated.
pub async fn signin(
    client: &reqwest::Client,
    email: &str,
    password: &str,
) -> Result<String, RenderError> {
    let url = format!("{}/auth/signin", config::api_base_url());
    let resp = client
        .post(&url)
        .json(&SigninRequest { email, password })
        .send()
        .await
        .map_err(|e| RenderError::Auth(format!("request failed: {e}")))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(RenderError::Auth(format!("upstream status {status}")));
    }
    let body: SigninResponse = resp
        .json()
        .await
        .map_err(|e| RenderError::Auth(format!("failed to decode response: {e}")))?;
    Ok(body.token)
}
