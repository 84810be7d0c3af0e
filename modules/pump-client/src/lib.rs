pub mod error;
pub mod wallet;

pub use error::{PumpError, Result};
pub use wallet::{login_message, LoginWallet};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use serde::{Deserialize, Serialize};

const DEFAULT_SITE_URL: &str = "https://pump.fun";
const DEFAULT_FRONTEND_API_URL: &str = "https://frontend-api.pump.fun";
const DEFAULT_PROXY_API_URL: &str = "https://client-proxy-server.pump.fun";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Header carrying the per-thread token on comment requests.
const THREAD_TOKEN_HEADER: &str = "x-aws-proxy-token";

/// Connection settings shared by every client built from them.
#[derive(Debug, Clone)]
pub struct PumpOptions {
    pub site_url: String,
    pub frontend_api_url: String,
    pub proxy_api_url: String,
    pub user_agent: String,
    pub http_proxy: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for PumpOptions {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_SITE_URL.to_string(),
            frontend_api_url: DEFAULT_FRONTEND_API_URL.to_string(),
            proxy_api_url: DEFAULT_PROXY_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_proxy: None,
            timeout: None,
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    address: &'a str,
    signature: String,
    timestamp: i64,
}

#[derive(Deserialize)]
struct ThreadTokenResponse {
    token: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CommentPayload<'a> {
    pub text: &'a str,
    pub mint: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<&'a str>,
}

/// One platform identity: its own cookie jar, login wallet and thread token.
///
/// Clients are cheap and meant to be short-lived; build a new one for every
/// unit of work that should look like a distinct visitor.
pub struct PumpClient {
    client: reqwest::Client,
    options: PumpOptions,
    wallet: LoginWallet,
    authenticated: bool,
    thread_token: Option<String>,
}

impl PumpClient {
    pub fn new(options: PumpOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(options.user_agent.clone())
            .default_headers(base_headers(&options.site_url)?);

        if let Some(proxy) = &options.http_proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| PumpError::Config(format!("invalid proxy url: {e}")))?;
            builder = builder.proxy(proxy);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| PumpError::Config(e.to_string()))?;

        Ok(Self {
            client,
            options,
            wallet: LoginWallet::generate(),
            authenticated: false,
            thread_token: None,
        })
    }

    /// Public address of this client's login wallet.
    pub fn address(&self) -> &str {
        self.wallet.address()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Gather site cookies, then log in by signing the login message.
    /// Session cookies land in this client's jar and ride along on later calls.
    pub async fn start(&mut self) -> Result<()> {
        self.gather_cookies().await?;

        let timestamp = chrono::Utc::now().timestamp_millis();
        let body = LoginRequest {
            address: self.wallet.address(),
            signature: self.wallet.sign(&login_message(timestamp)),
            timestamp,
        };

        let url = format!("{}/auth/login", self.options.frontend_api_url);
        let resp = self.client.post(&url).json(&body).send().await?;
        expect_status(resp, 201).await?;

        self.authenticated = true;
        tracing::debug!(address = %self.wallet.address(), "Logged in");
        Ok(())
    }

    async fn gather_cookies(&self) -> Result<()> {
        let url = format!("{}/board", self.options.site_url);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PumpError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Fetch the token that authorizes comment submission, caching it on the client.
    pub async fn thread_token(&mut self) -> Result<String> {
        if let Some(token) = &self.thread_token {
            return Ok(token.clone());
        }

        let url = format!("{}/token/generateTokenForThread", self.options.frontend_api_url);
        let resp = self.client.get(&url).send().await?;
        let resp = expect_status(resp, 200).await?;

        let body = resp.text().await?;
        let parsed: ThreadTokenResponse = serde_json::from_str(&body)
            .map_err(|e| PumpError::Parse(format!("{e}, body: {body}")))?;

        self.thread_token = Some(parsed.token.clone());
        Ok(parsed.token)
    }

    /// Post a comment on a coin thread. `image` is an already-uploaded file URI.
    pub async fn post_comment(&mut self, mint: &str, text: &str, image: Option<&str>) -> Result<()> {
        let token = self.thread_token().await?;
        let payload = CommentPayload { text, mint, image };

        let url = format!("{}/comment", self.options.proxy_api_url);
        let resp = self
            .client
            .post(&url)
            .header(THREAD_TOKEN_HEADER, token)
            .json(&payload)
            .send()
            .await?;
        expect_status(resp, 200).await?;

        tracing::debug!(mint, "Comment posted");
        Ok(())
    }

    pub async fn like_message(&self, message_id: &str) -> Result<()> {
        if !self.authenticated {
            return Err(PumpError::AuthRequired);
        }

        let url = format!("{}/likes/{}", self.options.frontend_api_url, message_id);
        let resp = self.client.post(&url).send().await?;
        expect_status(resp, 201).await?;
        Ok(())
    }
}

fn base_headers(site_url: &str) -> Result<HeaderMap> {
    let site = site_url.trim_end_matches('/');
    let parse = |value: &str| {
        HeaderValue::from_str(value).map_err(|e| PumpError::Config(format!("bad header value: {e}")))
    };

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ORIGIN, parse(site)?);
    headers.insert(REFERER, parse(&format!("{site}/"))?);
    Ok(headers)
}

async fn expect_status(resp: reqwest::Response, expected: u16) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.as_u16() != expected {
        let message = resp.text().await.unwrap_or_default();
        return Err(PumpError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_payload_omits_missing_image() {
        let payload = CommentPayload {
            text: "gm",
            mint: "Mint111",
            image: None,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"text": "gm", "mint": "Mint111"})
        );
    }

    #[test]
    fn comment_payload_includes_image() {
        let payload = CommentPayload {
            text: "gm",
            mint: "Mint111",
            image: Some("ipfs://abc"),
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap()["image"],
            serde_json::json!("ipfs://abc")
        );
    }

    #[test]
    fn base_headers_derive_origin_and_referer() {
        let headers = base_headers("https://example.test/").unwrap();
        assert_eq!(headers[ORIGIN], "https://example.test");
        assert_eq!(headers[REFERER], "https://example.test/");
    }

    #[test]
    fn invalid_proxy_is_config_error() {
        let options = PumpOptions {
            http_proxy: Some("not a url".to_string()),
            ..PumpOptions::default()
        };
        assert!(matches!(PumpClient::new(options), Err(PumpError::Config(_))));
    }

    #[tokio::test]
    async fn like_requires_login() {
        let client = PumpClient::new(PumpOptions::default()).unwrap();
        assert!(!client.is_authenticated());
        let err = client.like_message("123").await.unwrap_err();
        assert!(matches!(err, PumpError::AuthRequired));
    }

    #[test]
    fn each_client_has_its_own_wallet() {
        let a = PumpClient::new(PumpOptions::default()).unwrap();
        let b = PumpClient::new(PumpOptions::default()).unwrap();
        assert_ne!(a.address(), b.address());
    }
}
