//! 大模型客户端
//!
//! 走 OpenAI 兼容的 `/chat/completions` 接口（默认百炼兼容端点）。
//! 客户端不做重试，单次失败直接上报。

use std::time::Duration;

use async_trait::async_trait;
use medassist_core::models::{ChatMessage, ChatRole};
use medassist_core::{LanguageModel, MedError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_MODEL: &str = "qwen-plus-latest";

/// 大模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

/// OpenAI 兼容协议客户端
pub struct OpenAiCompatClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            warn!("LLM api key is not configured, requests will be rejected upstream");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MedError::Config(format!("无法创建HTTP客户端: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(
        &'a self,
        prompt: &'a str,
        history: &'a [ChatMessage],
        system_prompt: Option<&'a str>,
        stream: bool,
    ) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(system) = system_prompt {
            messages.push(WireMessage { role: "system", content: system });
        }
        messages.extend(history.iter().map(|m| WireMessage {
            role: role_name(m.role),
            content: &m.content,
        }));
        messages.push(WireMessage { role: "user", content: prompt });

        CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            stream,
        }
    }

    async fn send(&self, body: &CompletionRequest<'_>) -> Result<reqwest::Response> {
        let mut request = self.client.post(self.endpoint()).json(body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MedError::Generation(format!("LLM 调用失败: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MedError::Generation(format!("LLM 调用失败: HTTP {} {}", status, detail)));
        }
        Ok(response)
    }
}

/// SSE 行缓冲
///
/// 网络分块可能切断多字节字符，按字节缓存，只解码以 `\n` 结尾的完整行。
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// 追加一个分块，返回其中已完整的行（不含换行符）
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let raw = &raw[..raw.len() - 1];
            lines.push(String::from_utf8_lossy(raw).trim_end_matches('\r').to_string());
        }
        lines
    }
}

/// 从一行 SSE 数据中取出增量文本；返回 Err(()) 表示流结束
fn parse_sse_line(line: &str) -> std::result::Result<Option<String>, ()> {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Err(());
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => Ok(chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())),
        Err(e) => {
            debug!("Skipping malformed stream chunk: {}", e);
            Ok(None)
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatClient {
    async fn generate(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        system_prompt: Option<&str>,
    ) -> Result<String> {
        let body = self.build_request(prompt, history, system_prompt, false);
        info!(model = %self.config.model, messages = body.messages.len(), "Calling language model");

        let response = self.send(&body).await?;
        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| MedError::Generation(format!("LLM 响应解析失败: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| MedError::Generation("LLM 响应为空".to_string()))?;

        info!(chars = content.chars().count(), "Language model responded");
        Ok(content)
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        system_prompt: Option<&str>,
    ) -> Result<mpsc::Receiver<Result<String>>> {
        let body = self.build_request(prompt, history, system_prompt, true);
        info!(model = %self.config.model, "Calling language model in streaming mode");

        let mut response = self.send(&body).await?;
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let mut lines = SseLineBuffer::default();
            loop {
                match response.chunk().await {
                    Ok(Some(bytes)) => {
                        for line in lines.push(&bytes) {
                            match parse_sse_line(&line) {
                                Ok(Some(fragment)) => {
                                    if tx.send(Ok(fragment)).await.is_err() {
                                        debug!("Stream receiver dropped, stopping");
                                        return;
                                    }
                                }
                                Ok(None) => {}
                                Err(()) => return,
                            }
                        }
                    }
                    Ok(None) => return,
                    Err(e) => {
                        error!("Language model stream failed: {}", e);
                        let failure = MedError::Generation(format!("LLM 流式调用失败: {}", e));
                        if tx.send(Err(failure)).await.is_err() {
                            debug!("Stream receiver dropped before failure was delivered");
                        }
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_message_order() {
        let client = OpenAiCompatClient::new(LlmConfig::default()).unwrap();
        let history = vec![ChatMessage::user("血压高怎么办"), ChatMessage::assistant("建议限盐")];
        let body = client.build_request("还需要吃药吗", &history, Some("系统提示"), false);

        let roles: Vec<&str> = body.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(body.messages.last().unwrap().content, "还需要吃药吗");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = LlmConfig { base_url: "http://localhost:8000/v1/".into(), ..Default::default() };
        let client = OpenAiCompatClient::new(config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_parse_sse_lines() {
        let line = r#"data: {"choices":[{"delta":{"content":"降压"}}]}"#;
        assert_eq!(parse_sse_line(line), Ok(Some("降压".to_string())));
        assert_eq!(parse_sse_line("data: [DONE]"), Err(()));
        assert_eq!(parse_sse_line(": keep-alive"), Ok(None));
        assert_eq!(parse_sse_line(r#"data: {"choices":[{"delta":{}}]}"#), Ok(None));
    }

    #[test]
    fn test_line_buffer_keeps_split_characters_intact() {
        let line = "data: 降压\n".as_bytes();
        // “降”编码为 E9 99 8D，在第二个字节后切开
        let split = line.iter().position(|&b| b == 0xE9).unwrap() + 2;

        let mut buffer = SseLineBuffer::default();
        assert!(buffer.push(&line[..split]).is_empty());
        assert_eq!(buffer.push(&line[split..]), vec!["data: 降压".to_string()]);
        assert!(buffer.pending.is_empty());
    }

    #[test]
    fn test_line_buffer_splits_multiple_lines_and_crlf() {
        let mut buffer = SseLineBuffer::default();
        let lines = buffer.push(b"data: a\r\n\ndata: [DO");
        assert_eq!(lines, vec!["data: a".to_string(), String::new()]);
        assert_eq!(buffer.push(b"NE]\n"), vec!["data: [DONE]".to_string()]);
    }

    #[test]
    fn test_split_sse_payload_parses_to_original_text() {
        let payload = "data: {\"choices\":[{\"delta\":{\"content\":\"降压\"}}]}\n".as_bytes();
        let mut buffer = SseLineBuffer::default();
        let mut fragments = Vec::new();
        for chunk in payload.chunks(5) {
            for line in buffer.push(chunk) {
                if let Ok(Some(fragment)) = parse_sse_line(&line) {
                    fragments.push(fragment);
                }
            }
        }
        assert_eq!(fragments, vec!["降压".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_generation_error() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = OpenAiCompatClient::new(config).unwrap();
        let err = client.generate("你好", &[], None).await.err().unwrap();
        assert!(matches!(err, MedError::Generation(_)));
    }
}
