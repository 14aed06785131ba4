//! Client for a local Ollama instance. Completions are requested with
//! `format: "json"`, but the reply still has to be defensively cleaned:
//! models wrap output in markdown fences or pad it with prose, so we strip
//! fences and pull out the first balanced `{...}` block before parsing.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::debug;

use crate::error::AppError;

pub const DEFAULT_MODEL: &str = "llama3.1:latest";

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const JOB_CONTENT_LIMIT: usize = 15_000;
const PROFILE_CONTENT_LIMIT: usize = 20_000;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    format: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<Value>,
}

#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    host: String,
}

impl OllamaClient {
    pub fn new(host: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(OllamaClient { http, host })
    }

    /// Host from `OLLAMA_HOST`, request timeout from `OLLAMA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let host = env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let timeout_secs = env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(host, Duration::from_secs(timeout_secs))
    }

    /// Installed models, as reported by the Ollama `/api/tags` endpoint.
    pub async fn list_models(&self) -> Result<Vec<Value>, AppError> {
        let url = format!("{}/api/tags", self.host);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::LlmUnreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AppError::LlmUnreachable(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| AppError::LlmInvalidJson(e.to_string()))?;
        Ok(tags.models)
    }

    /// Run a completion and parse the reply as a JSON object.
    pub async fn generate_json(&self, model: &str, prompt: &str) -> Result<Value, AppError> {
        let url = format!("{}/api/generate", self.host);
        let request = GenerateRequest {
            model,
            prompt,
            format: "json",
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::LlmUnreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AppError::LlmUnreachable(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::LlmInvalidJson(e.to_string()))?;

        let cleaned = clean_json_reply(&body.response);
        if cleaned.is_empty() {
            return Err(AppError::LlmEmpty(format!(
                "Ollama returned an empty response. The model \"{}\" may not have generated output. Try a different model.",
                model
            )));
        }

        debug!(model, reply_len = cleaned.len(), "parsing LLM reply");
        serde_json::from_str(&cleaned).map_err(|e| AppError::LlmInvalidJson(e.to_string()))
    }

    pub async fn extract_job_info(
        &self,
        page_content: &str,
        url: &str,
        title: &str,
        model: &str,
    ) -> Result<Value, AppError> {
        let content = truncate_chars(page_content, JOB_CONTENT_LIMIT);
        let prompt = format!(
            r#"You are a job information extraction assistant. Extract job information from the following webpage and return it as a valid JSON object.
IMPORTANT: You must respond with ONLY valid JSON. No markdown, no code blocks, no explanations, just the raw JSON object.
Required JSON structure:
{{
  "title": "Job title",
  "company": "Company name",
  "location": "Job location (can be string or array of strings)",
  "description": "Brief job description summary",
  "salary_lower_bound": "Lower bound of salary range as number (e.g., 126000) or null if not available",
  "salary_upper_bound": "Upper bound of salary range as number (e.g., 255000) or null if not available",
  "salary_currency": "Currency code (e.g., 'USD', 'EUR') or null",
  "requirements": "Key requirements or qualifications (can be string or array of strings)",
  "applicationUrl": "Application URL if mentioned, otherwise null",
  "postedDate": "Posted date if available, otherwise null"
}}
Webpage Title: {title}
Webpage URL: {url}
Page Content:
{content}
Now extract the job information and return ONLY the JSON object:"#
        );
        self.generate_json(model, &prompt).await
    }

    pub async fn extract_email_info(
        &self,
        email_content: &str,
        model: &str,
    ) -> Result<Value, AppError> {
        let content = truncate_chars(email_content, JOB_CONTENT_LIMIT);
        let prompt = format!(
            r#"You are an email parsing assistant. Extract the fields of the following email and return them as a valid JSON object.
IMPORTANT: You must respond with ONLY valid JSON. No markdown, no code blocks, no explanations, just the raw JSON object.
Required JSON structure:
{{
  "subject": "Email subject or null",
  "from": "Sender address or null",
  "to": "Recipient address or null",
  "body": "The email body as given",
  "body_text": "Plain-text version of the body",
  "received_at": "Date the email was received in ISO 8601 format, otherwise null"
}}
Email:
{content}
Now extract the email information and return ONLY the JSON object:"#
        );
        self.generate_json(model, &prompt).await
    }

    pub async fn extract_linkedin_profile(
        &self,
        linkedin_url: &str,
        page_content: &str,
        model: &str,
    ) -> Result<Value, AppError> {
        let content = truncate_chars(page_content, PROFILE_CONTENT_LIMIT);
        let prompt = format!(
            r#"You are a resume extraction assistant. Extract all relevant information from a LinkedIn profile page and structure it as a comprehensive resume object.

IMPORTANT: You must respond with ONLY valid JSON. No markdown, no code blocks, no explanations, just the raw JSON object.

Required JSON structure:
{{
  "personal_info": {{
    "name": "Full name",
    "headline": "Professional headline",
    "location": "Location",
    "email": "Email if available, otherwise null",
    "phone": "Phone if available, otherwise null",
    "linkedin_url": "LinkedIn profile URL",
    "website": "Personal website if available, otherwise null"
  }},
  "summary": "Professional summary/about section",
  "experience": [
    {{
      "title": "Job title",
      "company": "Company name",
      "location": "Location",
      "start_date": "Start date (YYYY-MM or YYYY-MM-DD format)",
      "end_date": "End date (YYYY-MM or YYYY-MM-DD format) or 'present' if current",
      "description": "Job description",
      "achievements": ["Achievement 1", "Achievement 2"],
      "skills_used": ["Skill 1", "Skill 2"]
    }}
  ],
  "education": [
    {{
      "degree": "Degree name",
      "field": "Field of study",
      "school": "School name",
      "location": "Location",
      "start_date": "Start date (YYYY-MM or YYYY format)",
      "end_date": "End date (YYYY-MM or YYYY format)",
      "description": "Additional details if available, otherwise null",
      "gpa": "GPA if available, otherwise null"
    }}
  ],
  "skills": [
    {{
      "name": "Skill name",
      "category": "Technical, Soft, Language, etc.",
      "proficiency": "Beginner, Intermediate, Advanced, Expert, or null if unknown"
    }}
  ],
  "certifications": [
    {{
      "name": "Certification name",
      "issuer": "Issuing organization",
      "issue_date": "Issue date (YYYY-MM or YYYY format)",
      "expiry_date": "Expiry date if applicable, otherwise null",
      "credential_id": "Credential ID if available, otherwise null",
      "credential_url": "URL to verify credential if available, otherwise null"
    }}
  ],
  "projects": [
    {{
      "name": "Project name",
      "description": "Project description",
      "start_date": "Start date if available, otherwise null",
      "end_date": "End date if available, otherwise null",
      "url": "Project URL if available, otherwise null",
      "technologies": ["Tech 1", "Tech 2"]
    }}
  ],
  "languages": [
    {{
      "language": "Language name",
      "proficiency": "Native, Fluent, Conversational, Basic, or null if unknown"
    }}
  ],
  "volunteer_experience": [
    {{
      "role": "Volunteer role",
      "organization": "Organization name",
      "start_date": "Start date if available, otherwise null",
      "end_date": "End date if available, otherwise null",
      "description": "Description of volunteer work"
    }}
  ],
  "publications": [
    {{
      "title": "Publication title",
      "publisher": "Publisher name",
      "date": "Publication date",
      "url": "URL if available, otherwise null"
    }}
  ],
  "awards": [
    {{
      "title": "Award title",
      "issuer": "Issuing organization",
      "date": "Award date",
      "description": "Description if available, otherwise null"
    }}
  ]
}}

LinkedIn Profile URL: {linkedin_url}

Page Content:
{content}

Extract all available information from this LinkedIn profile page and return ONLY the JSON object. If a section is not available, use an empty array []."#
        );
        self.generate_json(model, &prompt).await
    }
}

fn truncate_chars(content: &str, limit: usize) -> String {
    content.chars().take(limit).collect()
}

/// Strip markdown fences and keep the first balanced `{...}` block.
fn clean_json_reply(raw: &str) -> String {
    let mut trimmed = raw.trim();
    for prefix in ["```json", "```JSON", "```"] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            trimmed = rest.trim_start();
            break;
        }
    }
    if let Some(rest) = trimmed.strip_suffix("```") {
        trimmed = rest.trim_end();
    }

    match extract_json_object(trimmed) {
        Some(object) => object.to_string(),
        None => trimmed.to_string(),
    }
}

fn extract_json_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in input[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n{\"title\": \"Engineer\"}\n```";
        assert_eq!(clean_json_reply(raw), "{\"title\": \"Engineer\"}");
    }

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let raw = "Here is the data: {\"a\": {\"b\": 1}} hope that helps";
        assert_eq!(clean_json_reply(raw), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_extraction() {
        let raw = "{\"note\": \"uses { and } inside\"} trailing";
        assert_eq!(clean_json_reply(raw), "{\"note\": \"uses { and } inside\"}");
    }

    #[test]
    fn empty_reply_stays_empty() {
        assert_eq!(clean_json_reply("   "), "");
        assert_eq!(clean_json_reply("```\n```"), "");
    }
}
