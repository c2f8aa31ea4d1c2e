//! Project structure tool — a gitignore-aware recursive tree of the
//! project, written to a JSON file the model can reference later.

use async_trait::async_trait;
use codevet_core::error::ToolError;
use codevet_core::tool::{Tool, ToolOutput};
use serde::Serialize;
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT_FILE: &str = "project_structure.json";

/// Directories that are never worth walking.
const ALWAYS_SKIPPED: &[&str] = &[".git", "target", "node_modules"];

pub struct ProjectStructureTool {
    exclude_dirs: Vec<String>,
}

impl ProjectStructureTool {
    pub fn new(exclude_dirs: Vec<String>) -> Self {
        Self { exclude_dirs }
    }
}

#[derive(Debug, Serialize)]
struct Node {
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
}

#[derive(Debug, Default)]
struct WalkStats {
    files: u64,
    directories: u64,
}

#[async_trait]
impl Tool for ProjectStructureTool {
    fn name(&self) -> &str {
        "project_structure"
    }

    fn description(&self) -> &str {
        "Produce a JSON tree of the project's directory structure, \
         respecting .gitignore by default, and save it to a file for later \
         reference."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Root folder to analyse. Defaults to the current directory."
                },
                "output_path": {
                    "type": "string",
                    "description": "Where to write the JSON structure file."
                },
                "include_ignored": {
                    "type": "boolean",
                    "description": "Include files and directories matched by .gitignore."
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolOutput, ToolError> {
        let root = PathBuf::from(arguments["path"].as_str().unwrap_or("."));
        let include_ignored = arguments["include_ignored"].as_bool().unwrap_or(false);
        let output_path = arguments["output_path"]
            .as_str()
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join(DEFAULT_OUTPUT_FILE));

        if !root.is_dir() {
            return Ok(ToolOutput::error(format!(
                "Folder not found or is not a directory: {}",
                root.display()
            )));
        }

        let exclude = self.exclude_dirs.clone();
        let result = tokio::task::spawn_blocking(move || {
            let ignore = if include_ignored {
                Vec::new()
            } else {
                load_gitignore(&root)
            };
            let mut stats = WalkStats::default();
            let tree = walk(&root, &root, &ignore, &exclude, &mut stats)?;
            let json = serde_json::to_string_pretty(&tree).map_err(std::io::Error::other)?;
            std::fs::write(&output_path, json)?;
            Ok::<_, std::io::Error>((output_path, stats))
        })
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: "project_structure".into(),
            reason: e.to_string(),
        })?;

        match result {
            Ok((output_path, stats)) => {
                tracing::info!(
                    files = stats.files,
                    directories = stats.directories,
                    output = %output_path.display(),
                    "project structure written"
                );
                Ok(ToolOutput::ok()
                    .with("structure_file", output_path.display().to_string())
                    .with("total_files", stats.files)
                    .with("total_directories", stats.directories))
            }
            Err(e) => Ok(ToolOutput::error(format!(
                "Error analysing project structure: {e}"
            ))),
        }
    }
}

fn walk(
    dir: &Path,
    root: &Path,
    ignore: &[String],
    exclude: &[String],
    stats: &mut WalkStats,
) -> Result<Node, std::io::Error> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    stats.directories += 1;

    let mut children = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let entry_name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = path.is_dir();

        if is_dir
            && (ALWAYS_SKIPPED.contains(&entry_name.as_str())
                || exclude.iter().any(|d| d == &entry_name))
        {
            continue;
        }

        let rel = path
            .strip_prefix(root)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| entry_name.clone());
        if is_ignored(&entry_name, &rel, is_dir, ignore) {
            continue;
        }

        if is_dir {
            children.push(walk(&path, root, ignore, exclude, stats)?);
        } else {
            stats.files += 1;
            children.push(Node {
                name: entry_name,
                kind: "file",
                children: Vec::new(),
            });
        }
    }

    Ok(Node {
        name,
        kind: "directory",
        children,
    })
}

/// Read the root `.gitignore`, keeping non-comment, non-negated patterns.
fn load_gitignore(root: &Path) -> Vec<String> {
    let Ok(raw) = std::fs::read_to_string(root.join(".gitignore")) else {
        return Vec::new();
    };
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .map(String::from)
        .collect()
}

/// Simplified .gitignore matching: bare names, trailing-slash directory
/// patterns, `/`-anchored paths, and `*` globs.
fn is_ignored(name: &str, rel_path: &str, is_dir: bool, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        let (pattern, dir_only) = match pattern.strip_suffix('/') {
            Some(p) => (p, true),
            None => (pattern.as_str(), false),
        };
        if dir_only && !is_dir {
            return false;
        }
        match pattern.strip_prefix('/') {
            Some(anchored) => glob_match(anchored, rel_path),
            None => glob_match(pattern, name) || glob_match(pattern, rel_path),
        }
    })
}

/// `*`-only wildcard matching.
fn glob_match(pattern: &str, text: &str) -> bool {
    fn inner(p: &[u8], t: &[u8]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some(b'*'), _) => inner(&p[1..], t) || (!t.is_empty() && inner(p, &t[1..])),
            (Some(pc), Some(tc)) if pc == tc => inner(&p[1..], &t[1..]),
            _ => false,
        }
    }
    inner(pattern.as_bytes(), text.as_bytes())
}
