use anyhow::{bail, Context, Result};
use rand::{thread_rng, Rng};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub api_base: Option<String>,
    /// Key from config; falls back to GROQ_API_KEY in the environment.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

pub struct LlmClient {
    http: Client,
}

impl LlmClient {
    pub fn new_with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    pub fn new() -> Result<Self> { Self::new_with_timeout(Duration::from_secs(60)) }

    pub async fn send(&self, req: LlmRequest) -> Result<LlmResponse> {
        let base = req
            .api_base
            .clone()
            .unwrap_or_else(|| GROQ_API_BASE.to_string());
        let url = format!("{}/chat/completions", base);
        let api_key = req
            .api_key
            .clone()
            .or_else(|| env::var("GROQ_API_KEY").ok())
            .filter(|k| !k.trim().is_empty());
        let Some(api_key) = api_key else {
            bail!("missing GROQ_API_KEY; run `drla init` or set it in the environment");
        };

        #[derive(Serialize)]
        struct GroqRequest<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
            temperature: f32,
            max_tokens: u32,
            top_p: f32,
            stream: bool,
        }

        #[derive(Deserialize)]
        struct GroqChoiceMessage {
            content: String,
        }

        #[derive(Deserialize)]
        struct GroqChoice {
            message: Option<GroqChoiceMessage>,
        }

        #[derive(Deserialize)]
        struct GroqUsage {
            prompt_tokens: Option<u32>,
            completion_tokens: Option<u32>,
            total_tokens: Option<u32>,
        }

        #[derive(Deserialize)]
        struct GroqResponse {
            choices: Vec<GroqChoice>,
            usage: Option<GroqUsage>,
        }

        let body = GroqRequest {
            model: &req.model,
            messages: &req.messages,
            temperature: 0.5,
            max_tokens: 8192,
            top_p: 1.0,
            stream: false,
        };

        let res = with_retries(|| async {
            let resp = self.http.post(&url).json(&body).bearer_auth(&api_key).send().await?;
            Ok::<_, anyhow::Error>(resp)
        })
        .await?;
        if res.status() != StatusCode::OK {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            bail!("groq error {}: {}", status, text);
        }
        let parsed: GroqResponse = res.json().await?;
        let content = parsed
            .choices
            .get(0)
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let usage = parsed.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        Ok(LlmResponse { content, usage })
    }
}

pub async fn with_retries<F, Fut, T>(mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let mut attempt = 0u32;
    let max_retries = 3u32;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                attempt += 1;
                if attempt > max_retries {
                    return Err(e).context("request failed after retries");
                }
                let backoff_ms = (2u64.pow(attempt) * 100) + thread_rng().gen_range(0..100);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }
    }
}

// Provider adapter trait + registry
#[async_trait::async_trait]
pub trait ModelProviderAdapter: Send + Sync {
    async fn send(&self, req: LlmRequest) -> Result<LlmResponse>;
}

pub struct GroqAdapter {
    client: LlmClient,
}

impl GroqAdapter {
    pub fn new_with_timeout(timeout: Duration) -> Result<Self> { Ok(Self { client: LlmClient::new_with_timeout(timeout)? }) }
    pub fn new() -> Result<Self> { Self::new_with_timeout(Duration::from_secs(60)) }
}

#[async_trait::async_trait]
impl ModelProviderAdapter for GroqAdapter {
    async fn send(&self, req: LlmRequest) -> Result<LlmResponse> { self.client.send(req).await }
}

pub struct ProviderRegistry {
    map: HashMap<String, Box<dyn ModelProviderAdapter>>, // keyed by provider name (lowercase)
}

impl ProviderRegistry {
    pub fn new() -> Result<Self> {
        Self::new_with_timeout(Duration::from_secs(60))
    }

    pub fn new_with_timeout(timeout: Duration) -> Result<Self> {
        let mut map: HashMap<String, Box<dyn ModelProviderAdapter>> = HashMap::new();
        map.insert("groq".to_string(), Box::new(GroqAdapter::new_with_timeout(timeout)?));
        Ok(Self { map })
    }

    pub fn get(&self, name: &str) -> Option<&Box<dyn ModelProviderAdapter>> { self.map.get(&name.to_lowercase()) }
}

/// Strip chain-of-thought tags and markdown fences that reasoning models
/// wrap around rule output.
pub fn clean_model_output(raw: &str) -> Result<String> {
    let think_re = Regex::new(r"(?is)<think(?:ing)?>.*?</think(?:ing)?>")?;
    let cleaned = think_re.replace_all(raw, "");
    let cleaned = cleaned
        .replace("```drl", "")
        .replace("```json", "")
        .replace("```", "");
    Ok(cleaned.trim().to_string())
}

pub fn build_generate_prompt(context: &str, requirements: &str) -> String {
    format!(
        r#"You are a Drools rules expert. Generate a complete DRL rule based on the repository context and requirements.

REPOSITORY CONTEXT:
{context}

REQUIREMENTS:
{requirements}

INSTRUCTIONS:
1. Use the Java model classes from the context
2. Follow proper DRL syntax
3. Include clear comments
4. Reference existing patterns from the DRL files in context
5. Ensure the rule integrates well with existing rules
6. Return ONLY the complete DRL rule content with proper syntax
7. DO NOT include any markdown code blocks (```drl``` or ```)
8. DO NOT include any thinking tags (<Thinking> or </Thinking>)
9. DO NOT include any explanatory text before or after the rule
10. Return the full DRL file content, not just the modified part
"#
    )
}

pub fn build_analyze_prompt(context: &str, rule_content: &str) -> String {
    format!(
        r#"Analyze the following DRL rule in the context of the repository.

REPOSITORY CONTEXT:
{context}

DRL RULE TO ANALYZE:
{rule_content}

Provide analysis in JSON format with these keys:
- summary: Brief description of what the rule does (string)
- issues: List of potential issues or problems (array of strings)
- suggestions: List of improvement suggestions (array of strings)
- compatibility: How well it integrates with existing rules (string)
- performance: Performance considerations (string)

Return valid JSON only.
"#
    )
}

pub fn build_digest_prompt(chunk_text: &str, index: usize, total: usize) -> String {
    format!(
        r#"You are preparing repository context for Drools rule work. This is part {index} of {total}.

Condense the following files into a compact digest that preserves everything needed to write or review rules: Java class names with their fields and types, rule names with their conditions and actions, and decision table structure. Omit boilerplate and imports.

{chunk_text}
"#
    )
}

/// Cheap credential check used by `drla init --validate`.
pub async fn validate_groq_credentials(
    api_key_opt: Option<&str>,
    api_base_opt: Option<&str>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let base = api_base_opt
        .map(|s| s.to_string())
        .unwrap_or_else(|| GROQ_API_BASE.to_string());
    let key = match api_key_opt {
        Some(k) => k.to_string(),
        None => env::var("GROQ_API_KEY").context("GROQ_API_KEY not set")?,
    };
    if key.trim().is_empty() {
        bail!("missing API key for groq");
    }
    let http = Client::builder().timeout(Duration::from_secs(timeout_secs.unwrap_or(10))).build()?;
    // Use a cheap GET to the models endpoint
    let url = format!("{}/models", base);
    let resp = http.get(&url).bearer_auth(&key).send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        bail!("credential validation failed {}: {}", status, text);
    }
    Ok(())
}
