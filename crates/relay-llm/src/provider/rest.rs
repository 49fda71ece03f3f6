//! Runner over the HTTP REST API, direct or through an AI gateway

use async_trait::async_trait;
use futures_util::StreamExt;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use relay_config::{BackendAuth, BackendConfig, GatewayConfig};
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use url::Url;

use super::{Runner, RunnerOutput};
use crate::error::LlmError;
use crate::protocol::runner::{RunnerBody, RunnerRequest};

/// Default base URL of the direct REST API
const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Default base URL of the AI gateway
const DEFAULT_GATEWAY_URL: &str = "https://gateway.ai.cloudflare.com/v1";

/// Header carrying the gateway token for delegated auth
const GATEWAY_AUTHORIZATION: &str = "cf-aig-authorization";

/// REST runner
pub struct RestRunner {
    name: String,
    client: Client,
    base_url: Url,
    account_id: String,
    gateway: Option<GatewayConfig>,
    auth: BackendAuth,
    headers: HeaderMap,
}

impl RestRunner {
    /// Create from backend configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if a base URL or configured header is invalid.
    pub fn new(config: &BackendConfig) -> Result<Self, LlmError> {
        let base_url = match (&config.base_url, &config.gateway) {
            (Some(url), _) => url.clone(),
            (None, Some(_)) => parse_default_url(DEFAULT_GATEWAY_URL)?,
            (None, None) => parse_default_url(DEFAULT_BASE_URL)?,
        };

        let name = if config.gateway.is_some() { "gateway" } else { "rest" };

        Ok(Self {
            name: name.to_owned(),
            client: Client::new(),
            base_url,
            account_id: config.account_id.clone(),
            gateway: config.gateway.clone(),
            auth: config.auth.clone(),
            headers: parse_headers(config)?,
        })
    }

    /// Build the run URL for a model
    fn run_url(&self, model: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let account = &self.account_id;

        match &self.gateway {
            Some(gateway) => format!("{base}/{account}/{}/workers-ai/{model}", gateway.id),
            None => format!("{base}/accounts/{account}/ai/run/{model}"),
        }
    }

    /// Attach credentials and gateway options
    fn authorize(&self, mut builder: RequestBuilder) -> RequestBuilder {
        builder = match &self.auth {
            BackendAuth::None => builder,
            BackendAuth::StaticKey { key } => builder.bearer_auth(key.expose_secret()),
            BackendAuth::Delegated { token } => {
                builder.header(GATEWAY_AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
            }
        };

        if let Some(gateway) = &self.gateway {
            if gateway.skip_cache {
                builder = builder.header("cf-aig-skip-cache", "true");
            }
            if let Some(ttl) = gateway.cache_ttl {
                builder = builder.header("cf-aig-cache-ttl", ttl.to_string());
            }
        }

        builder
    }
}

fn parse_default_url(raw: &str) -> Result<Url, LlmError> {
    Url::parse(raw).map_err(|e| LlmError::Internal(anyhow::anyhow!("invalid default URL {raw}: {e}")))
}

fn parse_headers(config: &BackendConfig) -> Result<HeaderMap, LlmError> {
    let mut headers = HeaderMap::with_capacity(config.headers.len());

    for (name, value) in &config.headers {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| LlmError::Internal(anyhow::anyhow!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| LlmError::Internal(anyhow::anyhow!("invalid value for header '{name}': {e}")))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

#[async_trait]
impl Runner for RestRunner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, request: &RunnerRequest) -> Result<RunnerOutput, LlmError> {
        let builder = self
            .client
            .post(self.run_url(&request.model))
            .headers(self.headers.clone())
            .json(request);

        let response = self.authorize(builder).send().await.map_err(|e| {
            tracing::error!(runner = %self.name, model = %request.model, error = %e, "runner request failed");
            LlmError::Upstream(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                runner = %self.name,
                model = %request.model,
                status = %status,
                "runner returned error"
            );
            return Err(LlmError::Upstream(format!("runner returned {status}: {body}")));
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/event-stream"));

        if is_event_stream {
            let bytes = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| LlmError::Streaming(e.to_string())));
            return Ok(RunnerOutput::Stream(Box::pin(bytes)));
        }

        let body: RunnerBody = response
            .json()
            .await
            .map_err(|e| LlmError::Upstream(format!("failed to parse response: {e}")))?;

        Ok(RunnerOutput::Json(body.into_response()?))
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use secrecy::SecretString;

    use super::*;

    fn config(gateway: Option<GatewayConfig>) -> BackendConfig {
        BackendConfig {
            account_id: "acct".to_owned(),
            base_url: None,
            auth: BackendAuth::StaticKey {
                key: SecretString::from("token"),
            },
            gateway,
            headers: IndexMap::new(),
        }
    }

    #[test]
    fn direct_url_includes_account_and_model() {
        let runner = RestRunner::new(&config(None)).unwrap();

        assert_eq!(runner.name(), "rest");
        assert_eq!(
            runner.run_url("@cf/meta/llama-3.1-8b-instruct"),
            "https://api.cloudflare.com/client/v4/accounts/acct/ai/run/@cf/meta/llama-3.1-8b-instruct"
        );
    }

    #[test]
    fn gateway_url_includes_gateway_id() {
        let gateway = GatewayConfig {
            id: "edge".to_owned(),
            skip_cache: false,
            cache_ttl: None,
        };
        let runner = RestRunner::new(&config(Some(gateway))).unwrap();

        assert_eq!(runner.name(), "gateway");
        assert_eq!(
            runner.run_url("@cf/meta/llama-3.1-8b-instruct"),
            "https://gateway.ai.cloudflare.com/v1/acct/edge/workers-ai/@cf/meta/llama-3.1-8b-instruct"
        );
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let mut config = config(None);
        config.base_url = Some(Url::parse("http://127.0.0.1:8080/client/v4/").unwrap());

        let runner = RestRunner::new(&config).unwrap();
        assert_eq!(
            runner.run_url("m"),
            "http://127.0.0.1:8080/client/v4/accounts/acct/ai/run/m"
        );
    }

    #[test]
    fn invalid_header_is_rejected() {
        let mut config = config(None);
        config.headers.insert("bad header".to_owned(), "x".to_owned());

        assert!(matches!(RestRunner::new(&config), Err(LlmError::Internal(_))));
    }
}
