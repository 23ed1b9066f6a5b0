//! Credentials and the OAuth2 authorization-code exchange

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, RpcError};

/// Token endpoint used to exchange authorization codes
pub const DEFAULT_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";

/// Scopes requested when authorizing through the voice client
pub const DEFAULT_SCOPES: &[&str] = &["rpc", "rpc.voice.read"];

/// How the RPC session authenticates after the handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Stay unauthenticated; voice queries will report "not authenticated"
    #[default]
    None,
    /// A previously obtained OAuth2 access token
    AccessToken(String),
    /// Run the authorize flow in the voice client, then exchange the code
    ClientSecret {
        secret: String,
        redirect_uri: Option<String>,
    },
}

/// Successful token endpoint reply
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Exchange an authorization code for an access token
///
/// `timeout` bounds the whole exchange, reading the reply included.
pub async fn exchange_code(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: Option<&str>,
    timeout: Duration,
) -> Result<TokenResponse> {
    let mut form = vec![
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("grant_type", "authorization_code"),
        ("code", code),
    ];
    if let Some(uri) = redirect_uri {
        form.push(("redirect_uri", uri));
    }

    let response = http
        .post(token_url)
        .form(&form)
        .timeout(timeout)
        .send()
        .await
        .map_err(token_error)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RpcError::Auth(format!(
            "token endpoint returned HTTP {}: {}",
            status.as_u16(),
            body
        )));
    }

    response.json::<TokenResponse>().await.map_err(|e| {
        if e.is_timeout() {
            token_error(e)
        } else {
            RpcError::Auth(format!("invalid token response: {}", e))
        }
    })
}

fn token_error(e: reqwest::Error) -> RpcError {
    if e.is_timeout() {
        RpcError::Timeout("token exchange".to_string())
    } else {
        RpcError::Auth(format!("token request failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_exchange_code_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/oauth2/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "abc".into()),
                Matcher::UrlEncoded("client_id".into(), "123".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok","token_type":"Bearer","expires_in":604800}"#)
            .create_async()
            .await;

        let url = format!("{}/api/oauth2/token", server.url());
        let token = exchange_code(&reqwest::Client::new(), &url, "123", "shh", "abc", None, TIMEOUT)
            .await
            .unwrap();

        assert_eq!(token.access_token, "tok");
        assert_eq!(token.expires_in, Some(604800));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/oauth2/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let url = format!("{}/api/oauth2/token", server.url());
        let err = exchange_code(&reqwest::Client::new(), &url, "123", "shh", "bad", None, TIMEOUT)
            .await
            .unwrap_err();

        match err {
            RpcError::Auth(msg) => assert!(msg.contains("400")),
            other => panic!("Expected RpcError::Auth, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_times_out() {
        // accepts the request and never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/oauth2/token", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            while socket.read(&mut buf).await.unwrap_or(0) > 0 {}
        });

        let started = std::time::Instant::now();
        let err = exchange_code(
            &reqwest::Client::new(),
            &url,
            "123",
            "shh",
            "abc",
            None,
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RpcError::Timeout(ref what) if what == "token exchange"));
        assert!(started.elapsed() < TIMEOUT);
    }
}
