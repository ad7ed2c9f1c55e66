//! Profile-generation collaborator: formats a request for the hosted model
//! and parses the structured job profile it returns. The generation logic
//! itself lives upstream; this module only owns the contract.

use crate::config::ProfileConfig;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRequest {
    pub role_name: String,
    pub role_purpose: String,
    pub job_level: String,
    #[serde(default)]
    pub benchmark_summary: Option<String>,
}

/// Structured profile returned by the hosted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProfile {
    pub job_description: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub key_competencies: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile service transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("profile service rejected the request with status {status}")]
    Status { status: u16 },
    #[error("profile service returned an unusable response: {detail}")]
    Malformed { detail: String },
}

/// Seam so the API layer and tests can swap the hosted client out.
pub trait ProfileGenerator: Send + Sync {
    fn generate(&self, request: &ProfileRequest) -> Result<JobProfile, ProfileError>;
}

/// Client for an OpenAI-style chat-completions endpoint, configured
/// explicitly — no process-wide singleton.
pub struct HostedProfileClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HostedProfileClient {
    pub fn from_config(config: &ProfileConfig) -> Result<Self, ProfileError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

impl ProfileGenerator for HostedProfileClient {
    fn generate(&self, request: &ProfileRequest) -> Result<JobProfile, ProfileError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(request) }],
            "temperature": 0.7,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProfileError::Status {
                status: status.as_u16(),
            });
        }

        let payload: serde_json::Value = response.json()?;
        parse_profile(&payload)
    }
}

fn build_prompt(request: &ProfileRequest) -> String {
    let benchmark = request
        .benchmark_summary
        .as_deref()
        .unwrap_or("Not provided");

    format!(
        "You are an expert HR business partner. Create a comprehensive job profile in JSON format.\n\n\
         Role: {role}\n\
         Level: {level}\n\
         Purpose: {purpose}\n\
         Benchmark Summary: {benchmark}\n\n\
         Return valid JSON with these keys:\n\
         1. \"job_description\": 2-3 sentences describing the role\n\
         2. \"responsibilities\": List of 5-7 key responsibilities\n\
         3. \"qualifications\": List of 3-5 minimum qualifications\n\
         4. \"key_competencies\": List of 3-5 critical soft skills\n\n\
         Keep it concise and professional.",
        role = request.role_name,
        level = request.job_level,
        purpose = request.role_purpose,
    )
}

/// Extract and parse the model's message content. Malformed payloads carry
/// detail for the caller's error surface instead of panicking.
fn parse_profile(payload: &serde_json::Value) -> Result<JobProfile, ProfileError> {
    let content = payload
        .pointer("/choices/0/message/content")
        .and_then(|value| value.as_str())
        .ok_or_else(|| ProfileError::Malformed {
            detail: "response carried no message content".to_string(),
        })?;

    serde_json::from_str(content).map_err(|err| ProfileError::Malformed {
        detail: format!("message content was not a job profile: {err}"),
    })
}
