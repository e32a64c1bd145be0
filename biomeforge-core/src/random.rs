//! Random Sources
//!
//! Every generation attempt consumes one draw triple. The HTTP source asks a
//! remote number service for three integers per call; the seeded source is
//! reproducible and needs no network.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::resolver::Draws;
use crate::tables::DrawDomain;

pub const DEFAULT_RANDOM_URL: &str =
    "http://www.randomnumberapi.com/api/v1.0/random?min=1&max=65535&count=3";

#[derive(Debug, Error)]
pub enum RandomSourceError {
    #[error("Random source unreachable: {0}")]
    Network(String),

    #[error("Random source returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed random source response: {0}")]
    Malformed(String),

    #[error("Draw {value} outside domain {min}..={max}")]
    OutOfDomain { value: i64, min: u32, max: u32 },

    #[error("Draw domain {min}..={max} is empty")]
    EmptyDomain { min: u32, max: u32 },
}

fn ensure_domain(domain: DrawDomain) -> Result<(), RandomSourceError> {
    if domain.is_empty() {
        return Err(RandomSourceError::EmptyDomain { min: domain.min, max: domain.max });
    }
    Ok(())
}

pub trait RandomSource {
    fn next_draws(&mut self) -> Result<Draws, RandomSourceError>;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_draws(&mut self) -> Result<Draws, RandomSourceError> {
        (**self).next_draws()
    }
}

/// Validate a raw response body of exactly three in-domain integers.
pub fn parse_draws(values: &[i64], domain: DrawDomain) -> Result<Draws, RandomSourceError> {
    let [background, foreground, object] = values else {
        return Err(RandomSourceError::Malformed(format!(
            "expected 3 integers, got {}",
            values.len()
        )));
    };

    let check = |value: i64| -> Result<u32, RandomSourceError> {
        u32::try_from(value)
            .ok()
            .filter(|draw| domain.contains(*draw))
            .ok_or(RandomSourceError::OutOfDomain { value, min: domain.min, max: domain.max })
    };

    Ok(Draws::new(check(*background)?, check(*foreground)?, check(*object)?))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomSourceConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_url() -> String { DEFAULT_RANDOM_URL.to_string() }
fn default_timeout_secs() -> u64 { 30 }

impl Default for RandomSourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Blocking HTTP client, one round trip per attempt.
pub struct HttpRandomSource {
    config: RandomSourceConfig,
    domain: DrawDomain,
    client: reqwest::blocking::Client,
}

impl HttpRandomSource {
    pub fn new(config: RandomSourceConfig, domain: DrawDomain) -> Result<Self, RandomSourceError> {
        ensure_domain(domain)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RandomSourceError::Network(e.to_string()))?;

        Ok(Self { config, domain, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

impl RandomSource for HttpRandomSource {
    fn next_draws(&mut self) -> Result<Draws, RandomSourceError> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .map_err(|e| RandomSourceError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(RandomSourceError::Status { status, body });
        }

        let values: Vec<i64> = response
            .json()
            .map_err(|e| RandomSourceError::Malformed(e.to_string()))?;

        tracing::debug!(?values, "random source response");
        parse_draws(&values, self.domain)
    }
}

/// Offline source driven by a fixed seed.
pub struct SeededRandomSource {
    rng: ChaCha8Rng,
    domain: DrawDomain,
}

impl SeededRandomSource {
    pub fn new(seed: u64, domain: DrawDomain) -> Result<Self, RandomSourceError> {
        ensure_domain(domain)?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            domain,
        })
    }
}

impl RandomSource for SeededRandomSource {
    fn next_draws(&mut self) -> Result<Draws, RandomSourceError> {
        let range = self.domain.min..=self.domain.max;
        Ok(Draws::new(
            self.rng.gen_range(range.clone()),
            self.rng.gen_range(range.clone()),
            self.rng.gen_range(range),
        ))
    }
}
