// src/refine/ollama.rs - RankingCapability backed by an Ollama server
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::models::records::{Candidate, Record};
use crate::refine::prompt::build_ranking_prompt;
use crate::refine::ranker::RankingCapability;
use crate::utils::config::RankerConfig;

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

/// Outcome of [`OllamaRanker::test_connection`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

pub struct OllamaRanker {
    client: Client,
    endpoint: Url,
    config: RankerConfig,
    /// Switched by the connection test to the first model that answers.
    active_model: RwLock<String>,
}

impl OllamaRanker {
    pub fn new(config: RankerConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid OLLAMA_URL '{}'", config.base_url))?;
        let endpoint = base
            .join("api/generate")
            .context("Failed to build Ollama generate endpoint")?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            active_model: RwLock::new(config.model.clone()),
            config,
        })
    }

    pub async fn active_model(&self) -> String {
        self.active_model.read().await.clone()
    }

    async fn generate(&self, model: &str, prompt: String, options: Option<OllamaOptions>) -> Result<String> {
        let request = OllamaRequest {
            model: model.to_string(),
            prompt,
            stream: false,
            options,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            return Err(anyhow!("Ollama returned status: {}", response.status()));
        }

        let body: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;
        Ok(body.response)
    }

    /// Sends a short prompt to the configured model, then to each fallback
    /// model, and keeps the first one that answers.
    pub async fn test_connection(&self) -> ConnectionStatus {
        if !self.config.enabled {
            return ConnectionStatus {
                success: false,
                message: "AI ranking is disabled (RANKER_ENABLED=false)".to_string(),
            };
        }

        let models = std::iter::once(&self.config.model).chain(self.config.fallback_models.iter());
        for model in models {
            info!("Testing Ollama model: {}", model);
            match self
                .generate(model, "Hello, are you working?".to_string(), None)
                .await
            {
                Ok(_) => {
                    info!("✅ Model {} is working", model);
                    *self.active_model.write().await = model.clone();
                    return ConnectionStatus {
                        success: true,
                        message: format!("Ollama is working with model: {}", model),
                    };
                }
                Err(e) => warn!("❌ Model {} failed: {:#}", model, e),
            }
        }

        ConnectionStatus {
            success: false,
            message: format!("No working Ollama models found at {}", self.config.base_url),
        }
    }
}

#[async_trait]
impl RankingCapability for OllamaRanker {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_available(&self) -> bool {
        self.config.enabled
    }

    async fn rank(&self, de: &Record, candidates: &[Candidate]) -> Result<String> {
        let prompt = build_ranking_prompt(de, candidates);
        let model = self.active_model().await;
        let text = self
            .generate(
                &model,
                prompt,
                Some(OllamaOptions {
                    temperature: 0.1,
                    top_p: 0.9,
                }),
            )
            .await?;
        debug!("Raw ranker response for {}: {}", de.url, text);
        Ok(text)
    }
}
