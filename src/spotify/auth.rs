use reqwest::{Client, Response, Url, header::AUTHORIZATION};

use crate::{
    config::Config,
    error::AuthError,
    types::{TokenErrorResponse, TokenResponse},
    utils,
};

/// Requests an app token with the client-credentials grant.
///
/// The client id and secret travel as HTTP Basic auth; the form only carries
/// `grant_type=client_credentials`.
///
/// # Errors
///
/// - [`AuthError::Config`] when no client secret is configured
/// - [`AuthError::Http`] on network failures or an undecodable body
/// - [`AuthError::Provider`] on any non-2xx status
pub async fn request_client_credentials(
    client: &Client,
    config: &Config,
) -> Result<TokenResponse, AuthError> {
    let secret = config.require_secret()?;
    let res = client
        .post(&config.token_url)
        .header(
            AUTHORIZATION,
            utils::basic_auth_header(&config.client_id, secret),
        )
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    read_token_response(res).await
}

/// Builds the URL of the interactive authorization prompt.
///
/// Uses the S256 challenge method; `state` is echoed back on redirect and
/// must be checked by the caller.
pub fn authorize_url(
    config: &Config,
    code_challenge: &str,
    state: &str,
) -> Result<String, AuthError> {
    let mut params = vec![
        ("client_id", config.client_id.as_str()),
        ("response_type", "code"),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("code_challenge_method", "S256"),
        ("code_challenge", code_challenge),
        ("state", state),
    ];
    if !config.scope.is_empty() {
        params.push(("scope", config.scope.as_str()));
    }

    Url::parse_with_params(&config.auth_url, &params)
        .map(String::from)
        .map_err(|e| AuthError::InvalidUrl(e.to_string()))
}

/// Exchanges an authorization code and its PKCE verifier for a user token.
///
/// The response carries both an access and a refresh token. The code is
/// single-use, so the exchange is never retried.
pub async fn exchange_code_pkce(
    client: &Client,
    config: &Config,
    code: &str,
    verifier: &str,
) -> Result<TokenResponse, AuthError> {
    let res = client
        .post(&config.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", config.redirect_uri.as_str()),
        ])
        .send()
        .await?;

    read_token_response(res).await
}

/// Exchanges a refresh token for a new access token.
///
/// The provider may or may not rotate the refresh token; callers keep the
/// old one when the response has none. An `invalid_grant` or
/// `invalid_request` answer surfaces as a terminal
/// [`AuthError::Provider`] (see [`AuthError::is_terminal_grant_error`]).
pub async fn refresh_token(
    client: &Client,
    config: &Config,
    refresh_token: &str,
) -> Result<TokenResponse, AuthError> {
    let res = client
        .post(&config.token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
        ])
        .send()
        .await?;

    read_token_response(res).await
}

async fn read_token_response(res: Response) -> Result<TokenResponse, AuthError> {
    let status = res.status();
    if !status.is_success() {
        let body: TokenErrorResponse = res.json().await.unwrap_or_default();
        let error = if body.error.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown_error")
                .to_string()
        } else {
            body.error
        };
        return Err(AuthError::Provider {
            status: status.as_u16(),
            error,
            description: body.error_description,
        });
    }

    Ok(res.json::<TokenResponse>().await?)
}
