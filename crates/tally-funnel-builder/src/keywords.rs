//! Keyword list attached to ad-click steps

use serde::{Serialize, Serializer};
use thiserror::Error;

pub const MIN_KEYWORD_LEN: usize = 2;
pub const MAX_KEYWORD_LEN: usize = 50;
pub const DEFAULT_MAX_KEYWORDS: usize = 20;

/// A keyword rejected by [`KeywordSet`]. One variant per rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeywordError {
    #[error("keyword '{keyword}' is shorter than {min} characters")]
    TooShort { keyword: String, min: usize },

    #[error("keyword '{keyword}' is longer than {max} characters")]
    TooLong { keyword: String, max: usize },

    #[error("keyword '{keyword}' may only contain letters, digits, spaces, '-' and '_'")]
    InvalidCharacters { keyword: String },

    #[error("keyword '{keyword}' is already in the list")]
    Duplicate { keyword: String },

    #[error("at most {max} keywords are allowed")]
    LimitReached { max: usize },
}

impl KeywordError {
    /// Stable identifier of the violated rule
    pub fn rule(&self) -> &'static str {
        match self {
            KeywordError::TooShort { .. } => "keyword_too_short",
            KeywordError::TooLong { .. } => "keyword_too_long",
            KeywordError::InvalidCharacters { .. } => "keyword_invalid_characters",
            KeywordError::Duplicate { .. } => "keyword_duplicate",
            KeywordError::LimitReached { .. } => "keyword_limit_reached",
        }
    }
}

/// Ordered, case-insensitively unique keywords with a size cap.
///
/// Every mutation either fully succeeds or leaves the set untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
    max: usize,
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_KEYWORDS)
    }
}

fn normalize(raw: &str) -> Result<String, KeywordError> {
    let keyword = raw.trim();
    let len = keyword.chars().count();

    if len < MIN_KEYWORD_LEN {
        return Err(KeywordError::TooShort {
            keyword: keyword.to_string(),
            min: MIN_KEYWORD_LEN,
        });
    }
    if len > MAX_KEYWORD_LEN {
        return Err(KeywordError::TooLong {
            keyword: keyword.to_string(),
            max: MAX_KEYWORD_LEN,
        });
    }
    if !keyword
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err(KeywordError::InvalidCharacters {
            keyword: keyword.to_string(),
        });
    }

    Ok(keyword.to_string())
}

impl KeywordSet {
    pub fn with_limit(max: usize) -> Self {
        Self {
            keywords: Vec::new(),
            max,
        }
    }

    pub fn limit(&self) -> usize {
        self.max
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        self.keywords.iter().any(|k| k.to_lowercase() == needle)
    }

    /// Validate and append one keyword.
    pub fn add(&mut self, raw: &str) -> Result<(), KeywordError> {
        let keyword = normalize(raw)?;

        if self.contains(&keyword) {
            return Err(KeywordError::Duplicate { keyword });
        }
        if self.keywords.len() >= self.max {
            return Err(KeywordError::LimitReached { max: self.max });
        }

        self.keywords.push(keyword);
        Ok(())
    }

    /// Build the set a full replacement would produce, without applying it.
    pub fn try_replace<I, S>(&self, keywords: I) -> Result<KeywordSet, KeywordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = KeywordSet::with_limit(self.max);
        for keyword in keywords {
            next.add(keyword.as_ref())?;
        }
        Ok(next)
    }
}

impl Serialize for KeywordSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.keywords.serialize(serializer)
    }
}
