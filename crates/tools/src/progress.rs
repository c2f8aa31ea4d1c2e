//! Progress update tool — the model's entry point to the cross-process
//! analysis-progress workflow.

use async_trait::async_trait;
use codevet_core::error::ToolError;
use codevet_core::tool::{Tool, ToolOutput};
use codevet_workflow::{PROGRESS_FILE, ProgressTracker, StepStatus};
use std::path::PathBuf;

pub struct UpdateProgressTool;

fn parse_status(raw: &str) -> Result<StepStatus, ToolError> {
    match raw {
        "Not Started" => Ok(StepStatus::NotStarted),
        "In Progress" => Ok(StepStatus::InProgress),
        "Completed" => Ok(StepStatus::Completed),
        "Failed" => Ok(StepStatus::Failed),
        other => Err(ToolError::InvalidArguments(format!(
            "Invalid status '{other}'. Must be 'Not Started', 'In Progress', 'Completed', or 'Failed'"
        ))),
    }
}

#[async_trait]
impl Tool for UpdateProgressTool {
    fn name(&self) -> &str {
        "update_progress"
    }

    fn description(&self) -> &str {
        "Record the outcome and status of a multi-step analysis step in the \
         shared progress file."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "project_folder": {
                    "type": "string",
                    "description": "Folder containing the progress file."
                },
                "step_name": {
                    "type": "string",
                    "description": "Name of the step being updated."
                },
                "status": {
                    "type": "string",
                    "enum": ["Not Started", "In Progress", "Completed", "Failed"],
                    "description": "The step's new status."
                },
                "outcome": {
                    "type": "string",
                    "description": "Description of the step's outcome."
                }
            },
            "required": ["project_folder", "step_name", "status"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolOutput, ToolError> {
        let project_folder = arguments["project_folder"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'project_folder' argument".into()))?
            .to_string();
        let step_name = arguments["step_name"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'step_name' argument".into()))?
            .to_string();
        let status = parse_status(
            arguments["status"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'status' argument".into()))?,
        )?;
        let outcome = arguments["outcome"].as_str().map(String::from);

        let progress_path = PathBuf::from(&project_folder).join(PROGRESS_FILE);
        let tracker_path = progress_path.clone();
        let step = step_name.clone();
        // The tracker blocks on the advisory lock, so it runs off the
        // async executor.
        let result = tokio::task::spawn_blocking(move || {
            ProgressTracker::new(tracker_path).update(&step, status, outcome)
        })
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: "update_progress".into(),
            reason: e.to_string(),
        })?;

        match result {
            Ok(()) => Ok(ToolOutput::ok()
                .with("message", format!("Progress updated for {step_name}"))
                .with("step_name", step_name)
                .with("progress_file", progress_path.display().to_string())),
            Err(e) => Ok(ToolOutput::error(format!(
                "Error accessing progress file: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_step_in_progress_file() {
        let dir = tempfile::tempdir().unwrap();

        let output = UpdateProgressTool
            .execute(serde_json::json!({
                "project_folder": dir.path().to_str().unwrap(),
                "step_name": "Generate report",
                "status": "Completed",
                "outcome": "report written",
            }))
            .await
            .unwrap();

        assert!(!output.is_error);
        let tracker = ProgressTracker::new(dir.path().join(PROGRESS_FILE));
        let progress = tracker.load().unwrap();
        assert_eq!(progress["Generate report"].status, StepStatus::Completed);
        assert_eq!(
            progress["Generate report"].outcome.as_deref(),
            Some("report written")
        );
    }

    #[tokio::test]
    async fn invalid_status_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = UpdateProgressTool
            .execute(serde_json::json!({
                "project_folder": dir.path().to_str().unwrap(),
                "step_name": "x",
                "status": "Done",
            }))
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn payload_points_at_progress_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = UpdateProgressTool
            .execute(serde_json::json!({
                "project_folder": dir.path().to_str().unwrap(),
                "step_name": "x",
                "status": "In Progress",
            }))
            .await
            .unwrap();
        assert!(
            output
                .get_str("progress_file")
                .unwrap()
                .ends_with(PROGRESS_FILE)
        );
    }
}
