//! Network seam between the controller and the generation service.

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, StatusCode};
use shared::{
    domain::PatternName,
    protocol::{GenerateRequest, GENERATE_PATH, PATTERNS_PATH},
};
use tracing::debug;
use url::Url;

use crate::error::ComposerError;

/// Raw outcome of a generation call, handed to the response interpreter untouched.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn list_patterns(&self) -> Result<Vec<PatternName>, ComposerError>;
    async fn generate(&self, request: &GenerateRequest)
        -> Result<GenerationResponse, ComposerError>;
}

pub struct HttpBackend {
    http: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(server_url: &str) -> Result<Self, ComposerError> {
        let trimmed = server_url.trim();
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        let base_url = Url::parse(&normalized).map_err(|err| ComposerError::InvalidServerUrl {
            url: server_url.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ComposerError> {
        self.base_url
            .join(path)
            .map_err(|err| ComposerError::InvalidServerUrl {
                url: self.base_url.to_string(),
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn list_patterns(&self) -> Result<Vec<PatternName>, ComposerError> {
        let url = self
            .endpoint(PATTERNS_PATH)
            .map_err(|err| ComposerError::CatalogLoad(err.to_string()))?;
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| ComposerError::CatalogLoad(err.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(ComposerError::CatalogLoad(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }
        res.json::<Vec<PatternName>>().await.map_err(|err| {
            debug!(error = %err, "pattern listing was not a JSON array of names");
            ComposerError::CatalogLoad("Unexpected response while loading patterns.".to_string())
        })
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerationResponse, ComposerError> {
        let url = self.endpoint(GENERATE_PATH)?;
        debug!(steps = request.payload.step_count(), %url, "sending generation request");
        let res = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|err| ComposerError::GenerationFailed(err.to_string()))?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res
            .bytes()
            .await
            .map_err(|err| ComposerError::GenerationFailed(err.to_string()))?;
        Ok(GenerationResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
