//! 跨文件搜索与替换
//!
//! 每次查询都直接扫描存储中的文件内容，不维护索引。替换结果写回
//! `PersistentStore`，并通知已打开的标签页，保证编辑缓冲区与存储一致。

mod debounce;
mod pattern;

pub use debounce::{PendingQuery, SearchDebouncer};
pub use pattern::{SearchOptions, SearchPattern};

use crate::kernel::services::ports::storage::Result;
use crate::kernel::services::ports::OpenTabSync;
use crate::kernel::storage::PersistentStore;
use crate::models::{FilePatch, FileRecord, ItemId};
use regex::{Captures, NoExpand};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMatch {
    /// 1-based.
    pub line: usize,
    /// 1-based, counted in characters.
    pub column: usize,
    pub matched_text: String,
    pub line_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSearchResult {
    pub file_id: ItemId,
    pub file_name: String,
    pub language: String,
    pub matches: Vec<LineMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub options: SearchOptions,
    pub files: Vec<FileSearchResult>,
}

impl SearchResults {
    fn empty(query: &str, options: SearchOptions) -> Self {
        Self {
            query: query.to_string(),
            options,
            files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_matches(&self) -> usize {
        self.files.iter().map(|f| f.matches.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced,
    /// No match starts at the requested location any more.
    Stale,
    /// The file does not exist.
    NotFound,
    InvalidPattern,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub files: usize,
    pub replacements: usize,
}

pub struct SearchEngine {
    store: Arc<PersistentStore>,
    tabs: Option<Arc<dyn OpenTabSync>>,
}

impl SearchEngine {
    pub fn new(store: Arc<PersistentStore>) -> Self {
        Self { store, tabs: None }
    }

    /// Open tabs: dirty ones are flushed before any read, and every write
    /// is pushed back into them.
    pub fn with_tabs(mut self, tabs: Arc<dyn OpenTabSync>) -> Self {
        self.tabs = Some(tabs);
        self
    }

    pub fn search(&self, query: &str, options: SearchOptions) -> Result<SearchResults> {
        let Some(pattern) = SearchPattern::compile(query, options) else {
            return Ok(SearchResults::empty(query, options));
        };

        self.flush_open_tabs()?;
        let files = self.store.get_all_files()?;
        let scanned = files.len();
        let mut results = SearchResults::empty(query, options);
        for file in files {
            if !pattern.may_match(&file.content) {
                continue;
            }
            let matches = scan_content(&pattern, &file.content);
            if matches.is_empty() {
                continue;
            }
            results.files.push(FileSearchResult {
                file_id: file.id,
                file_name: file.name,
                language: file.language,
                matches,
            });
        }

        tracing::debug!(
            query,
            scanned,
            files = results.files.len(),
            matches = results.total_matches(),
            "search finished"
        );
        Ok(results)
    }

    /// Replaces the match that starts at `line`:`column` (both 1-based,
    /// column in characters). Anything else at that spot is `Stale`.
    pub fn replace_one(
        &self,
        file_id: &ItemId,
        line: usize,
        column: usize,
        search_text: &str,
        replace_text: &str,
        options: SearchOptions,
    ) -> Result<ReplaceOutcome> {
        let Some(pattern) = SearchPattern::compile(search_text, options) else {
            return Ok(ReplaceOutcome::InvalidPattern);
        };
        self.flush_open_tab(file_id)?;
        let Some(file) = self.store.get_file(file_id)? else {
            return Ok(ReplaceOutcome::NotFound);
        };

        let mut lines: Vec<String> = file.content.split('\n').map(str::to_string).collect();
        let Some(target) = line.checked_sub(1).and_then(|idx| lines.get(idx)) else {
            return Ok(ReplaceOutcome::Stale);
        };
        let Some(start) = column.checked_sub(1).and_then(|c| char_to_byte(target, c)) else {
            return Ok(ReplaceOutcome::Stale);
        };

        // 只接受 search 会报告的匹配：重叠位置上的匹配不算
        let Some(caps) = pattern
            .regex()
            .captures_iter(target)
            .find(|caps| caps.get(0).is_some_and(|m| m.start() >= start))
            .filter(|caps| caps.get(0).is_some_and(|m| m.start() == start))
        else {
            tracing::debug!(id = %file_id, line, column, "match moved, replace skipped");
            return Ok(ReplaceOutcome::Stale);
        };
        let Some(whole) = caps.get(0) else {
            return Ok(ReplaceOutcome::Stale);
        };

        let replacement = expand_replacement(&pattern, &caps, replace_text);
        let rewritten = format!(
            "{}{}{}",
            &target[..whole.start()],
            replacement,
            &target[whole.end()..]
        );
        lines[line - 1] = rewritten;

        self.write_back(&file, lines.join("\n"))?;
        tracing::info!(id = %file_id, line, column, "match replaced");
        Ok(ReplaceOutcome::Replaced)
    }

    /// Replaces every match in one file; returns how many were replaced.
    pub fn replace_all_in_file(
        &self,
        file_id: &ItemId,
        query: &str,
        replace_text: &str,
        options: SearchOptions,
    ) -> Result<usize> {
        let Some(pattern) = SearchPattern::compile(query, options) else {
            return Ok(0);
        };
        self.flush_open_tab(file_id)?;
        let Some(file) = self.store.get_file(file_id)? else {
            return Ok(0);
        };
        self.replace_in_record(&pattern, &file, replace_text)
    }

    /// Replaces every match in every file of an earlier result set.
    pub fn replace_all_across_files(
        &self,
        results: &SearchResults,
        replace_text: &str,
    ) -> Result<ReplaceSummary> {
        let Some(pattern) = SearchPattern::compile(&results.query, results.options) else {
            return Ok(ReplaceSummary::default());
        };

        self.flush_open_tabs()?;
        let mut summary = ReplaceSummary::default();
        for entry in &results.files {
            let Some(file) = self.store.get_file(&entry.file_id)? else {
                tracing::warn!(id = %entry.file_id, "file vanished before replace");
                continue;
            };
            let replaced = self.replace_in_record(&pattern, &file, replace_text)?;
            if replaced > 0 {
                summary.files += 1;
                summary.replacements += replaced;
            }
        }

        tracing::info!(
            query = %results.query,
            files = summary.files,
            replacements = summary.replacements,
            "replace across files finished"
        );
        Ok(summary)
    }

    fn replace_in_record(
        &self,
        pattern: &SearchPattern,
        file: &FileRecord,
        replace_text: &str,
    ) -> Result<usize> {
        if !pattern.may_match(&file.content) {
            return Ok(0);
        }

        let mut count = 0usize;
        let lines: Vec<String> = file
            .content
            .split('\n')
            .map(|line| {
                let hits = pattern.regex().find_iter(line).count();
                if hits == 0 {
                    return line.to_string();
                }
                count += hits;
                if pattern.expands_captures() {
                    pattern.regex().replace_all(line, replace_text).into_owned()
                } else {
                    pattern
                        .regex()
                        .replace_all(line, NoExpand(replace_text))
                        .into_owned()
                }
            })
            .collect();
        if count == 0 {
            return Ok(0);
        }

        self.write_back(file, lines.join("\n"))?;
        tracing::debug!(id = %file.id, count, "replaced in file");
        Ok(count)
    }

    fn flush_open_tab(&self, file_id: &ItemId) -> Result<()> {
        if let Some(tabs) = &self.tabs {
            if tabs.flush_if_dirty(file_id)? {
                tracing::debug!(id = %file_id, "flushed dirty tab before replace");
            }
        }
        Ok(())
    }

    fn flush_open_tabs(&self) -> Result<()> {
        if let Some(tabs) = &self.tabs {
            let flushed = tabs.flush_all_dirty()?;
            if flushed > 0 {
                tracing::debug!(flushed, "flushed dirty tabs before scan");
            }
        }
        Ok(())
    }

    fn write_back(&self, file: &FileRecord, content: String) -> Result<()> {
        let patch = FilePatch {
            content: Some(content.clone()),
            is_user_modified: Some(true),
            ..FilePatch::default()
        };
        if self.store.update_file(&file.id, patch)?.is_none() {
            tracing::warn!(id = %file.id, "file vanished during replace");
            return Ok(());
        }
        if let Some(tabs) = &self.tabs {
            tabs.sync_external_content(&file.id, &content);
        }
        Ok(())
    }
}

fn scan_content(pattern: &SearchPattern, content: &str) -> Vec<LineMatch> {
    let mut matches = Vec::new();
    for (idx, line) in content.split('\n').enumerate() {
        // find_iter 会在空匹配后前进一个字符，不会卡住
        for m in pattern.regex().find_iter(line) {
            matches.push(LineMatch {
                line: idx + 1,
                column: line[..m.start()].chars().count() + 1,
                matched_text: m.as_str().to_string(),
                line_text: line.to_string(),
            });
        }
    }
    matches
}

/// Byte offset of the `chars`-th character; the end of the line counts.
fn char_to_byte(line: &str, chars: usize) -> Option<usize> {
    line.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(line.len()))
        .nth(chars)
}

fn expand_replacement(pattern: &SearchPattern, caps: &Captures<'_>, replace_text: &str) -> String {
    if !pattern.expands_captures() {
        return replace_text.to_string();
    }
    let mut out = String::new();
    caps.expand(replace_text, &mut out);
    out
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/search/mod.rs"]
mod tests;
