//! Built-in tool implementations for codevet.
//!
//! Every tool returns a flat key/value payload with the mandatory
//! `is_error` flag; file-producing tools include a `file_path` key so the
//! tool bridge can fold their output into the context cache.

pub mod file_list;
pub mod file_read;
pub mod file_write;
pub mod progress;
pub mod project_structure;

pub use file_list::ListFilesTool;
pub use file_read::ReadFileTool;
pub use file_write::WriteFileTool;
pub use progress::UpdateProgressTool;
pub use project_structure::ProjectStructureTool;

use codevet_core::ToolRegistry;

/// Build the static registry of built-in tools.
pub fn builtin_registry(exclude_dirs: &[String]) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ListFilesTool));
    registry.register(Box::new(ReadFileTool));
    registry.register(Box::new(WriteFileTool));
    registry.register(Box::new(ProjectStructureTool::new(exclude_dirs.to_vec())));
    registry.register(Box::new(UpdateProgressTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_all_builtins() {
        let registry = builtin_registry(&[]);
        assert_eq!(
            registry.names(),
            vec![
                "list_files",
                "project_structure",
                "read_file",
                "update_progress",
                "write_file",
            ]
        );
    }
}
