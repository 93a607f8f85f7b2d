//! OCR 客户端 - 基础设施层
//!
//! 把图片交给 OCR 引擎，只返回 (文本, 置信度)，不关心文本内容

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, OcrError};

/// OCR 结果
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    /// 0.0 ~ 1.0
    pub confidence: f32,
}

/// OCR 后端
#[derive(Debug, Clone)]
pub enum OcrBackend {
    /// OCR.Space 在线识别
    OcrSpace(OcrSpaceClient),
    /// 已经识别好的文本文件，置信度视为 1.0
    PlainText,
}

impl OcrBackend {
    /// 识别一个输入文件
    pub async fn recognize(&self, path: &Path) -> AppResult<OcrOutput> {
        match self {
            OcrBackend::OcrSpace(client) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "image.jpg".to_string());
                client.recognize(bytes, &file_name).await
            }
            OcrBackend::PlainText => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
                Ok(OcrOutput {
                    text,
                    confidence: 1.0,
                })
            }
        }
    }
}

/// OCR.Space API 客户端
#[derive(Debug, Clone)]
pub struct OcrSpaceClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    #[serde(default)]
    parsed_results: Option<Vec<OcrSpaceParsedResult>>,
    #[serde(rename = "OCRExitCode", default)]
    ocr_exit_code: JsonValue,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: JsonValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceParsedResult {
    #[serde(default)]
    parsed_text: String,
}

impl OcrSpaceClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }

    /// 上传图片并识别
    pub async fn recognize(&self, image: Vec<u8>, file_name: &str) -> AppResult<OcrOutput> {
        info!("🔍 正在识别图片: {} ({} 字节)", file_name, image.len());

        let form = Form::new()
            .text("apikey", self.api_key.clone())
            .text("language", "eng")
            .text("OCREngine", "2")
            .text("scale", "true")
            .part("file", Part::bytes(image).file_name(file_name.to_string()));

        let response = self
            .client
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::ocr_request_failed(&self.api_url, e))?;

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| AppError::ocr_request_failed(&self.api_url, e))?;

        debug!("OCR.Space 响应: {}", body);
        parse_ocr_space_response(body)
    }
}

/// 解析 OCR.Space 响应
pub fn parse_ocr_space_response(body: JsonValue) -> AppResult<OcrOutput> {
    let response: OcrSpaceResponse = serde_json::from_value(body)?;

    if response.is_errored_on_processing {
        return Err(AppError::Ocr(OcrError::ProcessingFailed {
            message: error_message_text(&response.error_message),
        }));
    }

    let exit_code = match &response.ocr_exit_code {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    let text = response
        .parsed_results
        .unwrap_or_default()
        .iter()
        .map(|r| r.parsed_text.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(OcrOutput {
        text,
        confidence: confidence_from_exit_code(exit_code),
    })
}

/// OCR.Space 不返回整体置信度，用退出码近似：1 全部成功，2 部分成功
pub fn confidence_from_exit_code(exit_code: Option<i64>) -> f32 {
    match exit_code {
        Some(1) => 1.0,
        Some(2) => 0.5,
        _ => 0.0,
    }
}

fn error_message_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        JsonValue::Null => "未知错误".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_successful_response() {
        let body = json!({
            "ParsedResults": [
                { "ParsedText": "What is the capital of France?\r\nA. Paris\r\nB. London\r\n" }
            ],
            "OCRExitCode": 1,
            "IsErroredOnProcessing": false
        });

        let output = parse_ocr_space_response(body).unwrap();
        assert_eq!(output.confidence, 1.0);
        assert!(output.text.starts_with("What is the capital of France?"));
        assert!(output.text.ends_with("B. London"));
    }

    #[test]
    fn test_parse_partial_response_has_lower_confidence() {
        let body = json!({
            "ParsedResults": [{ "ParsedText": "partial" }],
            "OCRExitCode": "2",
            "IsErroredOnProcessing": false
        });

        assert_eq!(parse_ocr_space_response(body).unwrap().confidence, 0.5);
    }

    #[test]
    fn test_parse_error_response() {
        let body = json!({
            "OCRExitCode": 99,
            "IsErroredOnProcessing": true,
            "ErrorMessage": ["Invalid API key", "Rejected"]
        });

        match parse_ocr_space_response(body) {
            Err(AppError::Ocr(OcrError::ProcessingFailed { message })) => {
                assert_eq!(message, "Invalid API key; Rejected");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_plain_text_backend_reads_file() {
        let path = std::env::temp_dir().join("mcq_scanner_plain_text_backend.txt");
        tokio::fs::write(&path, "Q1. Sample?\nA. x\nB. y").await.unwrap();

        let output = OcrBackend::PlainText.recognize(&path).await.unwrap();
        assert_eq!(output.confidence, 1.0);
        assert_eq!(output.text, "Q1. Sample?\nA. x\nB. y");

        let _ = tokio::fs::remove_file(&path).await;
    }
}
