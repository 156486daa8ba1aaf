//! 查询编译：字面量转义、整词边界、大小写
//!
//! - Literal 模式：`regex::escape` 后编译，另带一个 memchr `Finder` 做整文件预过滤
//!   （仅大小写敏感时可用）
//! - Regex 模式：原样编译，非法表达式返回 `None`

use memchr::memmem::Finder;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whole_word: bool,
}

impl SearchOptions {
    pub fn literal() -> Self {
        Self::default()
    }

    pub fn regex() -> Self {
        Self {
            regex: true,
            ..Self::default()
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn whole_word(mut self, yes: bool) -> Self {
        self.whole_word = yes;
        self
    }
}

/// A compiled query.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    regex: Regex,
    prefilter: Option<Finder<'static>>,
    expand_captures: bool,
}

impl SearchPattern {
    /// `None` for an empty query or an expression that does not compile.
    pub fn compile(query: &str, options: SearchOptions) -> Option<Self> {
        if query.is_empty() {
            return None;
        }

        let body = if options.regex {
            query.to_string()
        } else {
            regex::escape(query)
        };
        let source = if options.whole_word {
            format!(r"\b(?:{body})\b")
        } else {
            body
        };

        let regex = match RegexBuilder::new(&source)
            .case_insensitive(!options.case_sensitive)
            .build()
        {
            Ok(regex) => regex,
            Err(e) => {
                tracing::warn!(query, error = %e, "invalid search pattern");
                return None;
            }
        };

        let prefilter = (!options.regex && options.case_sensitive)
            .then(|| Finder::new(query.as_bytes()).into_owned());

        Some(Self {
            regex,
            prefilter,
            expand_captures: options.regex,
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Cheap rejection of haystacks that cannot contain a match.
    pub fn may_match(&self, haystack: &str) -> bool {
        match &self.prefilter {
            Some(finder) => finder.find(haystack.as_bytes()).is_some(),
            None => true,
        }
    }

    /// Regex queries expand `$1`-style references in replacements; literal
    /// queries insert the replacement verbatim.
    pub fn expands_captures(&self) -> bool {
        self.expand_captures
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/search/pattern.rs"]
mod tests;
