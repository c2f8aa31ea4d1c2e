//! File read tool.

use async_trait::async_trait;
use codevet_core::error::ToolError;
use codevet_core::tool::{Tool, ToolOutput};

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a specified file. Use this when asked about \
         file contents or to analyse code not already in your context."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path of the file to read."
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolOutput, ToolError> {
        let file_path = arguments["file_path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'file_path' argument".into()))?;

        match tokio::fs::read_to_string(file_path).await {
            Ok(content) => {
                tracing::debug!(path = file_path, bytes = content.len(), "file read");
                Ok(ToolOutput::ok()
                    .with("file_path", file_path)
                    .with("file_content", content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(ToolOutput::error(format!("File not found: {file_path}")))
            }
            Err(e) => Ok(ToolOutput::error(format!(
                "Error reading file {file_path}: {e}"
            ))),
        }
    }
}
