//! Comment summarizer backed by an Ollama-compatible chat endpoint.
//!
//! The deduplicated low-score comments are embedded in a Swedish
//! instruction prompt and sent as a single system message with streaming
//! enabled. The reply is accumulated fragment by fragment.

use crate::config::ModelConfig;
use crate::error::{Result, SurveyError};
use crate::models::SummaryOutcome;
use crate::summary::stream::{collect_stream, decode_events};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the summarizer.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub api_key: Option<String>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.3,
            timeout_seconds: 300,
            api_key: None,
        }
    }
}

impl From<&ModelConfig> for SummarizerConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            ollama_url: config.ollama_url.clone(),
            model_name: config.name.clone(),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
            api_key: config.api_key.clone(),
        }
    }
}

/// Message in the chat request.
#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// Heading shown above the generated summary.
pub const SUMMARY_HEADING: &str = "Sammanfattning av kommentarer där betyg är 1 eller 2";

/// Build the summarizer prompt around the comment list.
pub fn build_prompt(comments: &[String]) -> String {
    format!(
        "Kommentarer från företagare: {}\n\
         Du är en hjälpsam assistent som sammanfattar kommentarer som beskriver när företagare anser att kommunen \
         har trängt undan privat verksamhet, eller om kommunen bör göra ändringar inom denna frågan.\n\
         Sammanfatta kommentarer från företagare i 1-4 bullet points. Utgå från kommentarerna. \
         Om det inte finns kommentarer, skriv att det inte finns några kommentarer.",
        comments.join("\n")
    )
}

/// Streams comment summaries from the chat endpoint.
pub struct CommentSummarizer {
    config: SummarizerConfig,
    http_client: reqwest::Client,
}

impl CommentSummarizer {
    /// Create a new summarizer.
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        info!(
            "Initializing summarizer with model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SurveyError::summary(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    /// Summarize the comments.
    ///
    /// `on_fragment` receives each text fragment as it arrives; the
    /// returned string is every fragment concatenated in arrival order.
    pub async fn summarize<F>(&self, comments: &[String], on_fragment: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: build_prompt(comments),
            }],
            stream: true,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending summary request with {} comments", comments.len());

        let mut builder = self.http_client.post(&url).json(&request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SurveyError::summary(format!(
                    "request timed out after {}s",
                    self.config.timeout_seconds
                ))
            } else if e.is_connect() {
                SurveyError::summary(format!("cannot connect to {}", self.config.ollama_url))
            } else {
                SurveyError::summary(format!("failed to send request: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SurveyError::summary(format!("API error {}: {}", status, body)));
        }

        let text = collect_stream(decode_events(response.bytes_stream()), on_fragment).await?;
        info!("Received summary ({} characters)", text.chars().count());
        Ok(text)
    }
}

/// Stream the comment summary to stdout.
///
/// Failures are logged and returned as [`SummaryOutcome::Failed`] so the
/// rest of the report is still written.
pub async fn summarize_comments(
    config: &ModelConfig,
    comments: &[String],
    quiet: bool,
) -> SummaryOutcome {
    let summarizer = match CommentSummarizer::new(SummarizerConfig::from(config)) {
        Ok(s) => s,
        Err(e) => {
            warn!("{}", e);
            return SummaryOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    if !quiet {
        println!("\n🤖 {}", SUMMARY_HEADING);
        println!("   Model: {} ({} comments)\n", summarizer.model_name(), comments.len());
    }

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Waiting for the model...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let mut stdout = io::stdout();
    let result = summarizer
        .summarize(comments, |fragment| {
            if !spinner.is_finished() {
                spinner.finish_and_clear();
            }
            if !quiet {
                let _ = write!(stdout, "{}", fragment);
                let _ = stdout.flush();
            }
        })
        .await;

    spinner.finish_and_clear();
    if !quiet {
        println!();
    }

    match result {
        Ok(text) => SummaryOutcome::Generated { text },
        Err(e) => {
            warn!("{}", e);
            if !quiet {
                eprintln!("⚠️  {}", e);
            }
            SummaryOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return its base URL.
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Read the whole request before answering.
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_lowercase();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn model_config(url: &str) -> ModelConfig {
        ModelConfig {
            ollama_url: url.to_string(),
            timeout_seconds: 5,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_summarizer_config_default() {
        let config = SummarizerConfig::default();
        assert_eq!(config.model_name, "llama3.2:latest");
        assert_eq!(config.temperature, 0.3);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_build_prompt_embeds_comments() {
        let prompt = build_prompt(&["Kommunen hyr ut lokaler".to_string(), "Caféet".to_string()]);
        assert!(prompt.starts_with("Kommentarer från företagare: Kommunen hyr ut lokaler\nCaféet"));
        assert!(prompt.contains("1-4 bullet points"));
    }

    #[test]
    fn test_build_prompt_without_comments() {
        let prompt = build_prompt(&[]);
        assert!(prompt.starts_with("Kommentarer från företagare: \n"));
        assert!(prompt.contains("inte finns några kommentarer"));
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: "p".to_string(),
            }],
            stream: true,
            options: ChatOptions { temperature: 0.3 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn test_summarize_unreachable_endpoint() {
        let config = SummarizerConfig {
            ollama_url: "http://127.0.0.1:1".to_string(),
            timeout_seconds: 5,
            ..SummarizerConfig::default()
        };
        let summarizer = CommentSummarizer::new(config).unwrap();

        let err = summarizer
            .summarize(&["dyrt".to_string()], |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SurveyError::Summary { .. }));
    }

    #[tokio::test]
    async fn test_summarize_maps_error_status() {
        let url = serve_once(http_response("500 Internal Server Error", "model crashed")).await;
        let config = SummarizerConfig::from(&model_config(&url));
        let summarizer = CommentSummarizer::new(config).unwrap();

        let err = summarizer.summarize(&[], |_| {}).await.unwrap_err();
        match err {
            SurveyError::Summary { reason } => {
                assert!(reason.contains("500"));
                assert!(reason.contains("model crashed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_summarize_comments_generated() {
        let body = concat!(
            "{\"message\":{\"content\":\"- Kommunen \"},\"done\":false}\n",
            "{\"message\":{\"content\":\"hyr ut lokaler\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"\"},\"done\":true}\n",
        );
        let url = serve_once(http_response("200 OK", body)).await;

        let outcome = summarize_comments(&model_config(&url), &["dyrt".to_string()], true).await;
        assert_eq!(
            outcome,
            SummaryOutcome::Generated {
                text: "- Kommunen hyr ut lokaler".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_summarize_comments_failure_is_scoped() {
        let outcome =
            summarize_comments(&model_config("http://127.0.0.1:1"), &["dyrt".to_string()], true)
                .await;
        match outcome {
            SummaryOutcome::Failed { reason } => {
                assert!(reason.starts_with("Summary generation failed"));
            }
            other => panic!("expected a failed outcome, got {other:?}"),
        }

        // Stream closes before the end marker
        let truncated = "{\"message\":{\"content\":\"halv\"},\"done\":false}\n";
        let url = serve_once(http_response("200 OK", truncated)).await;
        let outcome = summarize_comments(&model_config(&url), &[], true).await;
        assert!(matches!(outcome, SummaryOutcome::Failed { .. }));
    }
}
