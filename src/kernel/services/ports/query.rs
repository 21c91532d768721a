//! 编译后的搜索查询
//!
//! - 字面量模式：输入先转义再编译
//! - 能匹配空串的模式被替换为永不匹配的 `x^`

use super::search::Result;
use regex::{Regex, RegexBuilder};

const NEVER_MATCHES: &str = "x^";

#[derive(Debug, Clone)]
pub struct SearchQuery {
    source: String,
    regex: Regex,
    case_sensitive: bool,
    use_regex: bool,
}

impl SearchQuery {
    pub fn parse(text: &str, case_sensitive: bool, use_regex: bool) -> Result<Self> {
        let pattern = if use_regex {
            text.to_string()
        } else {
            regex::escape(text)
        };
        let mut regex = RegexBuilder::new(&pattern)
            .case_insensitive(!case_sensitive)
            .build()?;
        if regex.is_match("") {
            regex = Regex::new(NEVER_MATCHES)?;
        }
        Ok(Self {
            source: text.to_string(),
            regex,
            case_sensitive,
            use_regex,
        })
    }

    /// 用户输入的原始文本
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 实际生效的模式
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn use_regex(&self) -> bool {
        self.use_regex
    }

    pub fn never_matches(&self) -> bool {
        self.regex.as_str() == NEVER_MATCHES
    }
}

impl PartialEq for SearchQuery {
    fn eq(&self, other: &Self) -> bool {
        self.pattern() == other.pattern()
            && self.case_sensitive == other.case_sensitive
            && self.use_regex == other.use_regex
    }
}

impl Eq for SearchQuery {}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/query.rs"]
mod tests;
