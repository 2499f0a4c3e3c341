use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use thiserror::Error;

use crate::{
    fingerprint::fingerprint_model::{ElementDescriptor, Fingerprint},
    healing::healing_model::HealOutcome,
    server::api_model::{ErrorBody, HealRequest, HealResponse, LearnRequest, LearnResponse},
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to healing server failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("healing server rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
}

/// Blocking client for a running healing server.
///
/// Must not be used from inside an async runtime.
pub struct HealingClient {
    base_url: String,
    http: Client,
}

impl HealingClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn learn(
        &self,
        page_key: &str,
        id: &str,
        descriptor: &ElementDescriptor,
    ) -> Result<Fingerprint, ClientError> {
        let response = self
            .http
            .post(format!("{}/learn", self.base_url))
            .json(&LearnRequest::from_descriptor(page_key, id, descriptor))
            .send()?;

        if response.status().is_success() {
            let body: LearnResponse = response.json()?;
            Ok(body.stored)
        } else {
            Err(rejected(response))
        }
    }

    /// Ask the server to heal `broken_id`; ambiguity and misses come back as
    /// outcomes, not errors.
    pub fn heal(
        &self,
        page_key: &str,
        broken_id: &str,
        snapshot: &str,
    ) -> Result<HealOutcome, ClientError> {
        let request = HealRequest {
            page_key: Some(page_key.to_string()),
            broken_id: Some(broken_id.to_string()),
            dom_snapshot: Some(snapshot.to_string()),
        };

        let response = self
            .http
            .post(format!("{}/heal", self.base_url))
            .json(&request)
            .send()?;

        match response.status() {
            StatusCode::OK => {
                let body: HealResponse = response.json()?;
                Ok(HealOutcome::Healed {
                    selector: body.selector,
                    confidence: body.confidence,
                    matched_id: body.matched_id,
                })
            }
            StatusCode::CONFLICT => {
                let body: ErrorBody = response.json()?;
                Ok(HealOutcome::Ambiguous {
                    tie_count: body.tie_count.unwrap_or(2),
                    confidence: body.confidence.unwrap_or(0.0),
                })
            }
            StatusCode::NOT_FOUND => {
                let body: ErrorBody = response.json()?;
                if body.outcome == "no_fingerprint" {
                    Ok(HealOutcome::NoFingerprint)
                } else {
                    Ok(HealOutcome::NotFound {
                        confidence: body.confidence.unwrap_or(0.0),
                    })
                }
            }
            _ => Err(rejected(response)),
        }
    }
}

fn rejected(response: Response) -> ClientError {
    let status = response.status();
    let message = match response.json::<ErrorBody>() {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    ClientError::Rejected { status, message }
}
