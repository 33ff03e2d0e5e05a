//! Keyword / regex search across a directory tree.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::tools::builtin::{allowed_extensions, read_text_lossy, walk_files};
use crate::tools::tool::{Tool, ToolError, ToolOutput, optional_bool, optional_str, require_str};

/// Cap on the number of matched files reported back.
const MAX_REPORTED_MATCHES: usize = 100;

/// Searches file contents below a directory.
///
/// Problems with the request itself (missing directory, bad regex) are
/// reported through `error_msg` rather than as an error.
#[derive(Debug, Default)]
pub struct BatchFileSearchTool;

#[derive(Debug, Default, Serialize)]
struct SearchReport {
    processed_count: usize,
    matched_count: usize,
    matched_files: Vec<MatchedFile>,
    error_msg: String,
}

#[derive(Debug, Serialize)]
struct MatchedFile {
    path: String,
    match_preview: String,
}

enum Matcher {
    Regex(Regex),
    Plain { keyword: String, case_sensitive: bool },
}

impl Matcher {
    fn count(&self, content: &str) -> usize {
        match self {
            Self::Regex(re) => re.find_iter(content).count(),
            Self::Plain {
                keyword,
                case_sensitive: true,
            } => usize::from(content.contains(keyword.as_str())),
            Self::Plain { keyword, .. } => {
                usize::from(content.to_lowercase().contains(&keyword.to_lowercase()))
            }
        }
    }
}

fn search(root: &Path, matcher: &Matcher, exts: &[String]) -> SearchReport {
    let mut report = SearchReport::default();
    let mut files: Vec<PathBuf> = Vec::new();
    walk_files(root, exts, &mut files);

    for path in files {
        let Some(content) = read_text_lossy(&path) else {
            continue;
        };
        report.processed_count += 1;

        let hits = matcher.count(&content);
        if hits > 0 {
            report.matched_count += 1;
            report.matched_files.push(MatchedFile {
                path: path.display().to_string(),
                match_preview: format!("Found {} matches", hits),
            });
        }
    }

    report.matched_files.truncate(MAX_REPORTED_MATCHES);
    report
}

#[async_trait]
impl Tool for BatchFileSearchTool {
    fn name(&self) -> &str {
        "batch-file-search"
    }

    fn description(&self) -> &str {
        "Search the contents of every file below a directory for a keyword or regular \
         expression. Returns the matching files (at most 100) with a match count preview."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "search_path": {
                    "type": "string",
                    "description": "Directory to search recursively"
                },
                "keyword": {
                    "type": "string",
                    "description": "Text or regular expression to look for"
                },
                "is_regex": {
                    "type": "boolean",
                    "description": "Treat keyword as a regular expression (default false)"
                },
                "file_filter": {
                    "type": "string",
                    "description": "Comma-separated extensions to include, e.g. \".txt,.md\""
                },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Match case exactly (default false)"
                }
            },
            "required": ["search_path", "keyword"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let root = PathBuf::from(require_str(&params, "search_path")?);
        let keyword = require_str(&params, "keyword")?.to_string();
        let is_regex = optional_bool(&params, "is_regex", false);
        let case_sensitive = optional_bool(&params, "case_sensitive", false);
        let exts = allowed_extensions(optional_str(&params, "file_filter", ""));

        if !root.exists() {
            let report = SearchReport {
                error_msg: format!("path does not exist: {}", root.display()),
                ..Default::default()
            };
            return Ok(ToolOutput::success(to_value(&report)?, start.elapsed()));
        }

        let matcher = if is_regex {
            match RegexBuilder::new(&keyword)
                .case_insensitive(!case_sensitive)
                .build()
            {
                Ok(re) => Matcher::Regex(re),
                Err(e) => {
                    let report = SearchReport {
                        error_msg: format!("invalid regular expression: {e}"),
                        ..Default::default()
                    };
                    return Ok(ToolOutput::success(to_value(&report)?, start.elapsed()));
                }
            }
        } else {
            Matcher::Plain {
                keyword,
                case_sensitive,
            }
        };

        let report = tokio::task::spawn_blocking(move || search(&root, &matcher, &exts))
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("search task failed: {e}")))?;

        tracing::debug!(
            processed = report.processed_count,
            matched = report.matched_count,
            "batch-file-search finished"
        );

        Ok(ToolOutput::success(to_value(&report)?, start.elapsed()))
    }
}

fn to_value<T: Serialize>(report: &T) -> Result<serde_json::Value, ToolError> {
    serde_json::to_value(report).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "TODO: write docs\ntodo again").unwrap();
        std::fs::write(dir.path().join("b.md"), "nothing to see").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.txt"), "another TODO").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_plain_search_case_insensitive() {
        let dir = fixture();
        let out = BatchFileSearchTool
            .execute(serde_json::json!({
                "search_path": dir.path().to_str().unwrap(),
                "keyword": "todo",
            }))
            .await
            .unwrap();

        assert!(out.is_ok());
        assert_eq!(out.result["matched_count"], 2);
        assert_eq!(out.result["processed_count"], 3);
    }

    #[tokio::test]
    async fn test_extension_filter_and_case_sensitivity() {
        let dir = fixture();
        let out = BatchFileSearchTool
            .execute(serde_json::json!({
                "search_path": dir.path().to_str().unwrap(),
                "keyword": "todo",
                "case_sensitive": true,
                "file_filter": ".txt",
            }))
            .await
            .unwrap();

        assert_eq!(out.result["processed_count"], 2);
        assert_eq!(out.result["matched_count"], 1);
        let path = out.result["matched_files"][0]["path"].as_str().unwrap();
        assert!(path.ends_with("a.txt"));
    }

    #[tokio::test]
    async fn test_regex_counts_matches() {
        let dir = fixture();
        let out = BatchFileSearchTool
            .execute(serde_json::json!({
                "search_path": dir.path().to_str().unwrap(),
                "keyword": "to+do",
                "is_regex": true,
                "file_filter": ".txt",
            }))
            .await
            .unwrap();

        let files = out.result["matched_files"].as_array().unwrap();
        let a = files
            .iter()
            .find(|f| f["path"].as_str().unwrap().ends_with("a.txt"))
            .unwrap();
        assert_eq!(a["match_preview"], "Found 2 matches");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_cycle_counted_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "TODO").unwrap();
        std::os::unix::fs::symlink(".", dir.path().join("loop")).unwrap();

        let out = BatchFileSearchTool
            .execute(serde_json::json!({
                "search_path": dir.path().to_str().unwrap(),
                "keyword": "TODO",
            }))
            .await
            .unwrap();

        assert_eq!(out.result["processed_count"], 1);
        assert_eq!(out.result["matched_count"], 1);
    }

    #[tokio::test]
    async fn test_soft_failures() {
        let out = BatchFileSearchTool
            .execute(serde_json::json!({
                "search_path": "/definitely/not/here",
                "keyword": "x",
            }))
            .await
            .unwrap();
        assert!(!out.is_ok());

        let dir = fixture();
        let out = BatchFileSearchTool
            .execute(serde_json::json!({
                "search_path": dir.path().to_str().unwrap(),
                "keyword": "(",
                "is_regex": true,
            }))
            .await
            .unwrap();
        assert!(!out.is_ok());
        assert!(
            out.result["error_msg"]
                .as_str()
                .unwrap()
                .contains("invalid regular expression")
        );
    }
}
