// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Post submission validator.
//!
//! - Title and content must be present and non-blank
//! - Title length is bounded by the `blog_posts.title` column

use thiserror::Error;
use tracing::debug;

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 255;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title and content are required")]
    MissingField(&'static str),

    #[error("Title must be less than {max} characters")]
    TitleTooLong { max: usize, actual: usize },
}

/// Post submission validator.
#[derive(Debug, Clone)]
pub struct PostValidator {
    max_title_chars: usize,
}

impl Default for PostValidator {
    fn default() -> Self {
        Self::new(MAX_TITLE_CHARS)
    }
}

impl PostValidator {
    pub fn new(max_title_chars: usize) -> Self {
        Self { max_title_chars }
    }

    /// Validate a submitted title and content.
    pub fn validate(&self, title: &str, content: &str) -> Result<(), ValidationError> {
        if title.trim().is_empty() {
            debug!("Missing title");
            return Err(ValidationError::MissingField("title"));
        }
        if content.trim().is_empty() {
            debug!("Missing content");
            return Err(ValidationError::MissingField("content"));
        }

        let title_chars = title.chars().count();
        if title_chars > self.max_title_chars {
            debug!(title_chars, max = self.max_title_chars, "Title too long");
            return Err(ValidationError::TitleTooLong {
                max: self.max_title_chars,
                actual: title_chars,
            });
        }

        Ok(())
    }
}
