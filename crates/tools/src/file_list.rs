//! Directory listing tool.

use async_trait::async_trait;
use codevet_core::error::ToolError;
use codevet_core::tool::{Tool, ToolOutput};

pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and folders in a specified directory. Use this when asked \
         about project structure or file listings."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The directory path to list. Use '.' for the current directory."
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolOutput, ToolError> {
        let path = arguments["path"].as_str().unwrap_or(".").to_string();

        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(_) => {
                return Ok(ToolOutput::error(format!("Directory not found: {path}")));
            }
        };

        let mut files = Vec::new();
        let mut folders = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            match entry.file_type().await {
                Ok(t) if t.is_dir() => folders.push(name),
                Ok(_) => files.push(name),
                Err(_) => files.push(name),
            }
        }
        files.sort();
        folders.sort();

        let mut listing = format!("Contents of directory: {path}\n");
        if files.is_empty() && folders.is_empty() {
            listing.push_str("(Empty directory)\n");
        } else {
            if !folders.is_empty() {
                listing.push_str("\nFolders:\n");
                for folder in &folders {
                    listing.push_str(&format!("  {folder}/\n"));
                }
            }
            if !files.is_empty() {
                listing.push_str("\nFiles:\n");
                for file in &files {
                    listing.push_str(&format!("  {file}\n"));
                }
            }
        }

        // The payload deliberately carries no file-content key: a listing
        // contributes nothing to the context cache.
        Ok(ToolOutput::ok().with("listing", listing))
    }
}
