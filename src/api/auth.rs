//! Login against the document API.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::info;

use super::ApiClient;
use crate::error::ApiError;

const LOGIN_PATH: &str = "/v1/auth/login";

#[derive(Deserialize)]
struct LoginResponse {
    key: String,
}

/// Exchange username/password for an API token.
///
/// Any non-2xx answer (bad credentials included) comes back as `ApiError::Status`.
pub async fn authenticate(
    client: &ApiClient,
    username: &str,
    password: &SecretString,
) -> Result<SecretString, ApiError> {
    info!(user = %username, url = %client.url(LOGIN_PATH), "Authenticating against document API");

    let resp: LoginResponse = client
        .post_form(
            LOGIN_PATH,
            &[("username", username), ("password", password.expose_secret())],
        )
        .await?;

    info!(user = %username, "Authenticated");
    Ok(SecretString::from(resp.key))
}

/// Authenticate and return a client that carries the token.
pub async fn login(
    client: ApiClient,
    username: &str,
    password: &SecretString,
) -> Result<ApiClient, ApiError> {
    let token = authenticate(&client, username, password).await?;
    Ok(client.with_token(token))
}
