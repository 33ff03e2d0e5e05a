//! Bulk file creation from a `{num}` name template.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;

use crate::tools::tool::{
    Tool, ToolError, ToolOutput, optional_bool, optional_str, require_param, require_str,
};

const ILLEGAL_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Creates `create_count` files named after `file_template`.
///
/// Existing files are skipped unless `overwrite` is set, in which case the
/// old file is kept next to the new one with a `.bak` suffix.
#[derive(Debug, Default)]
pub struct BatchFileCreateTool;

#[derive(Debug, Default, Serialize)]
struct CreateReport {
    success_count: usize,
    skipped_count: usize,
    overwritten_count: usize,
    failed_files: Vec<FailedFile>,
    created_files: Vec<String>,
    error_msg: String,
}

#[derive(Debug, Serialize)]
struct FailedFile {
    file: String,
    reason: String,
}

fn render_file_name(template: &str, num: u64) -> String {
    template
        .replace("{num}", &num.to_string())
        .chars()
        .map(|c| if ILLEGAL_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

fn create_one(path: &Path, content: &str, overwrite: bool) -> std::io::Result<Option<bool>> {
    let mut overwritten = false;
    if path.exists() {
        if !overwrite {
            return Ok(None);
        }
        let mut backup = path.as_os_str().to_owned();
        backup.push(".bak");
        std::fs::rename(path, PathBuf::from(backup))?;
        overwritten = true;
    }
    std::fs::write(path, content)?;
    Ok(Some(overwritten))
}

fn create_files(
    target: &Path,
    template: &str,
    count: u64,
    content: &str,
    overwrite: bool,
) -> CreateReport {
    let mut report = CreateReport::default();

    if let Err(e) = std::fs::create_dir_all(target) {
        report.error_msg = format!("failed to create target directory: {e}");
        return report;
    }

    for num in 1..=count {
        let file_name = render_file_name(template, num);
        match create_one(&target.join(&file_name), content, overwrite) {
            Ok(None) => report.skipped_count += 1,
            Ok(Some(overwritten)) => {
                if overwritten {
                    report.overwritten_count += 1;
                }
                report.success_count += 1;
                report.created_files.push(file_name);
            }
            Err(e) => report.failed_files.push(FailedFile {
                file: file_name,
                reason: e.to_string(),
            }),
        }
    }

    report
}

#[async_trait]
impl Tool for BatchFileCreateTool {
    fn name(&self) -> &str {
        "batch-file-create"
    }

    fn description(&self) -> &str {
        "Create several files in a directory from a name template containing {num} \
         (numbered from 1), optionally with initial content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target_path": {
                    "type": "string",
                    "description": "Directory to create the files in (created if missing)"
                },
                "file_template": {
                    "type": "string",
                    "description": "File name template, e.g. \"week_{num}.md\""
                },
                "create_count": {
                    "type": "integer",
                    "description": "How many files to create (positive)"
                },
                "file_content": {
                    "type": "string",
                    "description": "Initial content written to every file"
                },
                "overwrite": {
                    "type": "boolean",
                    "description": "Replace existing files, keeping a .bak copy (default false)"
                }
            },
            "required": ["target_path", "file_template", "create_count"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let target = PathBuf::from(require_str(&params, "target_path")?);
        let template = require_str(&params, "file_template")?.to_string();
        let content = optional_str(&params, "file_content", "").to_string();
        let overwrite = optional_bool(&params, "overwrite", false);

        let report = match require_param(&params, "create_count")?.as_u64() {
            Some(count) if count > 0 => tokio::task::spawn_blocking(move || {
                create_files(&target, &template, count, &content, overwrite)
            })
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("create task failed: {e}")))?,
            _ => CreateReport {
                error_msg: "create_count must be a positive integer".to_string(),
                ..Default::default()
            },
        };

        let value = serde_json::to_value(&report)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(ToolOutput::success(value, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_file_name() {
        assert_eq!(render_file_name("week_{num}.md", 3), "week_3.md");
        assert_eq!(render_file_name("a/b:{num}", 1), "a_b_1");
    }

    #[tokio::test]
    async fn test_creates_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let out = BatchFileCreateTool
            .execute(serde_json::json!({
                "target_path": target.to_str().unwrap(),
                "file_template": "week_{num}.md",
                "create_count": 2,
                "file_content": "hello",
            }))
            .await
            .unwrap();

        assert!(out.is_ok());
        assert_eq!(out.result["success_count"], 2);
        assert_eq!(
            std::fs::read_to_string(target.join("week_2.md")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_skip_and_overwrite_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f_1.txt"), "old").unwrap();

        let params = |overwrite: bool| {
            serde_json::json!({
                "target_path": dir.path().to_str().unwrap(),
                "file_template": "f_{num}.txt",
                "create_count": 1,
                "file_content": "new",
                "overwrite": overwrite,
            })
        };

        let out = BatchFileCreateTool.execute(params(false)).await.unwrap();
        assert_eq!(out.result["skipped_count"], 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f_1.txt")).unwrap(),
            "old"
        );

        let out = BatchFileCreateTool.execute(params(true)).await.unwrap();
        assert_eq!(out.result["overwritten_count"], 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f_1.txt.bak")).unwrap(),
            "old"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f_1.txt")).unwrap(),
            "new"
        );
    }

    #[tokio::test]
    async fn test_invalid_count_is_soft_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = BatchFileCreateTool
            .execute(serde_json::json!({
                "target_path": dir.path().to_str().unwrap(),
                "file_template": "x_{num}",
                "create_count": 0,
            }))
            .await
            .unwrap();
        assert!(!out.is_ok());
    }
}
