use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::types::{ClientStats, SkillSnapshot, TrajectoryAnalysis};

const MAX_SKILLS: usize = 100;
const MAX_RECOMMEND_SKILLS: usize = 50;
const MAX_SKILL_NAME_LEN: usize = 100;
const MAX_RECOMMENDATIONS: usize = 10;
const DEFAULT_TARGET_ROLE: &str = "Senior Developer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntelligenceConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub health_timeout: Duration,
    pub retry: RetryConfig,
    pub breaker: CircuitBreakerConfig,
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl IntelligenceConfig {
    /// Read overrides from `SM_AI_*`, falling back to the defaults above.
    pub fn from_env() -> Self {
        fn parse_u64(key: &str, default: u64) -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|raw| raw.parse::<u64>().ok())
                .unwrap_or(default)
        }

        fn parse_u32(key: &str, default: u32) -> u32 {
            std::env::var(key)
                .ok()
                .and_then(|raw| raw.parse::<u32>().ok())
                .unwrap_or(default)
        }

        let defaults = Self::default();
        Self {
            base_url: std::env::var("SM_AI_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(parse_u64("SM_AI_TIMEOUT_SECONDS", 30)),
            health_timeout: Duration::from_secs(parse_u64("SM_AI_HEALTH_TIMEOUT_SECONDS", 5)),
            retry: RetryConfig {
                max_attempts: parse_u32("SM_AI_MAX_RETRIES", 3),
                base_delay: Duration::from_millis(parse_u64("SM_AI_RETRY_BASE_DELAY_MS", 1_000)),
                max_delay: Duration::from_millis(parse_u64("SM_AI_RETRY_MAX_DELAY_MS", 10_000)),
            },
            breaker: CircuitBreakerConfig {
                failure_threshold: parse_u32("SM_AI_FAILURE_THRESHOLD", 5),
                reset_window: Duration::from_millis(parse_u64("SM_AI_RESET_WINDOW_MS", 60_000)),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http {status}: {message}")]
    Status { status: u16, message: String },
}

impl TransportError {
    /// Network failures, 5xx and 429 are worth retrying; other client errors
    /// will not resolve on their own.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Wire seam for the intelligence service, so tests can inject failing or
/// counting fakes underneath the retry and breaker logic.
#[async_trait]
pub trait IntelligenceTransport: Send + Sync {
    async fn post(&self, endpoint: &str, payload: &Value) -> Result<Value, TransportError>;

    /// `GET /health`, returning the status code.
    async fn health(&self) -> Result<u16, TransportError>;
}

struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
}

impl HttpTransport {
    fn new(config: &IntelligenceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("skillmesh-engine/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            health_timeout: config.health_timeout,
        })
    }
}

#[async_trait]
impl IntelligenceTransport for HttpTransport {
    async fn post(&self, endpoint: &str, payload: &Value) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .json(payload)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))
    }

    async fn health(&self) -> Result<u16, TransportError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        Ok(response.status().as_u16())
    }
}

#[derive(Debug, thiserror::Error)]
enum IntelligenceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("circuit breaker open; intelligence service temporarily unavailable")]
    CircuitOpen,
    #[error("intelligence service unavailable ({endpoint}): {message}")]
    Unavailable { endpoint: String, message: String },
}

/// Client for the remote skill-intelligence service (embeddings, similarity,
/// recommendations, trajectory analysis).
///
/// Every public operation degrades to a typed safe default instead of
/// surfacing an error: a dead intelligence service reduces match quality,
/// it must never fail a match computation. Breaker state lives on this
/// instance behind a mutex, not in any global.
pub struct IntelligenceClient {
    transport: Arc<dyn IntelligenceTransport>,
    breaker: Mutex<CircuitBreaker>,
    retry: RetryConfig,
    base_url: String,
}

impl IntelligenceClient {
    pub fn new(config: IntelligenceConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config)
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build against a custom transport (tests, alternate wire protocols).
    pub fn with_transport(
        config: IntelligenceConfig,
        transport: Arc<dyn IntelligenceTransport>,
    ) -> Self {
        Self {
            transport,
            breaker: Mutex::new(CircuitBreaker::new(config.breaker)),
            retry: config.retry,
            base_url: config.base_url,
        }
    }

    /// Embedding vector for a skill list; empty on degradation.
    pub async fn generate_embedding(&self, skills: &[String]) -> Vec<f32> {
        let sanitized = sanitize_skill_names(skills, MAX_SKILLS);
        if sanitized.is_empty() {
            debug!("no valid skills to embed");
            return Vec::new();
        }

        match self.request("/embed", json!({ "skills": sanitized })).await {
            Ok(response) => parse_embedding(&response).unwrap_or_else(|| {
                warn!("invalid embedding response from intelligence service");
                Vec::new()
            }),
            Err(err) => {
                warn!(error = %err, "embedding generation degraded to empty vector");
                Vec::new()
            }
        }
    }

    /// Semantic similarity between two skill sets, clamped to 0.0..=1.0;
    /// 0.0 on degradation.
    pub async fn analyze_skill_similarity(
        &self,
        skills_a: &[String],
        skills_b: &[String],
    ) -> f64 {
        let a = sanitize_skill_names(skills_a, MAX_SKILLS);
        let b = sanitize_skill_names(skills_b, MAX_SKILLS);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        match self
            .request("/similarity", json!({ "skills1": a, "skills2": b }))
            .await
        {
            Ok(response) => response
                .get("similarity")
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
                .clamp(0.0, 1.0),
            Err(err) => {
                warn!(error = %err, "similarity analysis degraded to zero");
                0.0
            }
        }
    }

    /// Up to ten suggested next skills; empty on degradation.
    pub async fn generate_skill_recommendations(&self, current_skills: &[String]) -> Vec<String> {
        let sanitized = sanitize_skill_names(current_skills, MAX_RECOMMEND_SKILLS);
        if sanitized.is_empty() {
            return Vec::new();
        }

        match self
            .request("/recommend", json!({ "skills": sanitized }))
            .await
        {
            Ok(response) => response
                .get("recommendations")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(|value| value.as_str().map(str::to_string))
                        .take(MAX_RECOMMENDATIONS)
                        .collect()
                })
                .unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "skill recommendations degraded to empty list");
                Vec::new()
            }
        }
    }

    /// Trajectory/drift analysis for a skill portfolio. Empty input yields
    /// the `unknown` analysis; degradation yields `unavailable`.
    pub async fn analyze_skill_trajectory(
        &self,
        skills: &[SkillSnapshot],
        target_role: &str,
    ) -> TrajectoryAnalysis {
        if skills.is_empty() {
            return TrajectoryAnalysis::unknown();
        }

        let role = if target_role.trim().is_empty() {
            DEFAULT_TARGET_ROLE
        } else {
            target_role
        };

        match self
            .request(
                "/analyze-trajectory",
                json!({ "skills": skills, "target_role": role }),
            )
            .await
        {
            Ok(response) => serde_json::from_value(response).unwrap_or_else(|err| {
                warn!(error = %err, "unparseable trajectory response");
                TrajectoryAnalysis::unavailable()
            }),
            Err(err) => {
                warn!(error = %err, "trajectory analysis degraded to offline response");
                TrajectoryAnalysis::unavailable()
            }
        }
    }

    /// Liveness probe. Never trips retries and never probes while the
    /// circuit is open.
    pub async fn health_check(&self) -> bool {
        if self.lock_breaker().is_open() {
            return false;
        }

        match self.transport.health().await {
            Ok(200) => {
                self.lock_breaker().record_success();
                true
            }
            Ok(status) => {
                warn!(status, "intelligence health check reported unhealthy");
                false
            }
            Err(err) => {
                warn!(error = %err, "intelligence health check failed");
                false
            }
        }
    }

    pub fn stats(&self) -> ClientStats {
        let breaker = self.lock_breaker();
        ClientStats {
            circuit_open: breaker.is_open(),
            failure_count: breaker.failure_count(),
            base_url: self.base_url.clone(),
        }
    }

    /// Single request path: breaker gate, then a bounded retry loop with
    /// exponential backoff and jitter. Breaker state is only touched at the
    /// final outcome of a call, never on intermediate attempts.
    async fn request(&self, endpoint: &str, payload: Value) -> Result<Value, IntelligenceError> {
        if endpoint.is_empty() || !endpoint.starts_with('/') {
            return Err(IntelligenceError::InvalidRequest(format!(
                "bad endpoint: {endpoint:?}"
            )));
        }
        if !payload.is_object() {
            return Err(IntelligenceError::InvalidRequest(
                "payload must be a JSON object".into(),
            ));
        }

        if !self.lock_breaker().try_acquire() {
            return Err(IntelligenceError::CircuitOpen);
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.post(endpoint, &payload).await {
                Ok(response) => {
                    self.lock_breaker().record_success();
                    return Ok(response);
                }
                Err(err) => {
                    if attempt < max_attempts && err.is_retryable() {
                        let delay = self.backoff_delay(attempt);
                        warn!(
                            endpoint,
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "intelligence request failed; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    self.lock_breaker().record_failure();
                    return Err(IntelligenceError::Unavailable {
                        endpoint: endpoint.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.retry.base_delay.as_millis() as u64;
        let exponential = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.retry.max_delay.as_millis() as u64);
        // Jitter spreads simultaneous retries from concurrent score batches.
        let jitter = rand::thread_rng().gen_range(0..1_000u64);
        Duration::from_millis(capped + jitter)
    }

    fn lock_breaker(&self) -> std::sync::MutexGuard<'_, CircuitBreaker> {
        self.breaker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn sanitize_skill_names(skills: &[String], max_count: usize) -> Vec<String> {
    skills
        .iter()
        .map(|skill| skill.trim())
        .filter(|skill| !skill.is_empty())
        .map(|skill| skill.chars().take(MAX_SKILL_NAME_LEN).collect())
        .take(max_count)
        .collect()
}

fn parse_embedding(response: &Value) -> Option<Vec<f32>> {
    response
        .get("embedding")?
        .as_array()?
        .iter()
        .map(|value| value.as_f64().map(|number| number as f32))
        .collect()
}
