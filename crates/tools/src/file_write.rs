//! File write tool.

use async_trait::async_trait;
use codevet_core::error::ToolError;
use codevet_core::tool::{Tool, ToolOutput};

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create a new file (or overwrite an existing one) with the given \
         content."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path of the file to create."
                },
                "content": {
                    "type": "string",
                    "description": "The content to write."
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolOutput, ToolError> {
        let file_path = arguments["file_path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'file_path' argument".into()))?;
        let content = arguments["content"].as_str().unwrap_or_default();

        match tokio::fs::write(file_path, content).await {
            Ok(()) => Ok(ToolOutput::ok()
                .with("file_path", file_path)
                .with("file_content", content)
                .with("message", format!("File created successfully: {file_path}"))),
            Err(e) => Ok(ToolOutput::error(format!(
                "An error occurred while creating file {file_path}: {e}"
            ))),
        }
    }
}
