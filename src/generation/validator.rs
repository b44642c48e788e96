//! Request validation for flashcard generation.
//!
//! Collects every violated constraint, each tagged with the offending
//! field, rather than stopping at the first failure. A request that
//! passes is wrapped in [`ValidRequest`] so the service layer can rely
//! on the bounds without re-checking them.

use serde::Serialize;
use thiserror::Error;

use super::models::{
    FlashcardProposal, GenerateRequest, BACK_MAX, COUNT_MAX, COUNT_MIN, FRONT_MAX, TEXT_MAX,
    TEXT_MIN,
};

/// A single violated constraint, tagged with the field it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// The complete list of constraints a request violated.
#[derive(Debug, Clone, Error)]
#[error("invalid request body ({} issue(s))", .issues.len())]
pub struct ValidationErrors {
    pub issues: Vec<ValidationIssue>,
}

/// A generation request whose bounds have been checked.
///
/// Only constructed by [`validate`] (or internally, from fields that are
/// already known to satisfy the bounds).
#[derive(Debug, Clone)]
pub struct ValidRequest {
    text: String,
    count: u32,
    existing_flashcards: Option<Vec<FlashcardProposal>>,
}

impl ValidRequest {
    pub(crate) fn from_parts(
        text: String,
        count: u32,
        existing_flashcards: Option<Vec<FlashcardProposal>>,
    ) -> Self {
        Self {
            text,
            count,
            existing_flashcards,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn existing_flashcards(&self) -> Option<&[FlashcardProposal]> {
        self.existing_flashcards.as_deref()
    }
}

/// Validate a generation request against the size constraints.
///
/// Returns the normalized request on success, or the full list of
/// violations on failure.
pub fn validate(request: GenerateRequest) -> Result<ValidRequest, ValidationErrors> {
    let mut issues = Vec::new();

    let text_len = request.text.chars().count();
    if text_len < TEXT_MIN {
        issues.push(ValidationIssue::new(
            "text",
            format!("Text must be at least {} characters long", TEXT_MIN),
        ));
    } else if text_len > TEXT_MAX {
        issues.push(ValidationIssue::new(
            "text",
            format!("Text cannot exceed {} characters", TEXT_MAX),
        ));
    }

    let mut count = 0u32;
    match request.count.as_u64() {
        Some(n) if n < COUNT_MIN as u64 => {
            issues.push(ValidationIssue::new(
                "count",
                "Must generate at least 1 flashcard",
            ));
        }
        Some(n) if n > COUNT_MAX as u64 => {
            issues.push(ValidationIssue::new(
                "count",
                format!("Cannot generate more than {} flashcards at once", COUNT_MAX),
            ));
        }
        Some(n) => count = n as u32,
        // Negative integers fail the lower bound like zero does.
        None if request.count.as_i64().is_some() => {
            issues.push(ValidationIssue::new(
                "count",
                "Must generate at least 1 flashcard",
            ));
        }
        None => {
            issues.push(ValidationIssue::new("count", "Count must be an integer"));
        }
    }

    if let Some(existing) = &request.existing_flashcards {
        for (i, card) in existing.iter().enumerate() {
            if card.front.chars().count() > FRONT_MAX {
                issues.push(ValidationIssue::new(
                    format!("existingFlashcards[{}].front", i),
                    format!("Front must not exceed {} characters", FRONT_MAX),
                ));
            }
            if card.back.chars().count() > BACK_MAX {
                issues.push(ValidationIssue::new(
                    format!("existingFlashcards[{}].back", i),
                    format!("Back must not exceed {} characters", BACK_MAX),
                ));
            }
        }
    }

    if !issues.is_empty() {
        return Err(ValidationErrors { issues });
    }

    Ok(ValidRequest {
        text: request.text,
        count,
        existing_flashcards: request.existing_flashcards,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text_len: usize, count: u32) -> GenerateRequest {
        GenerateRequest {
            text: "a".repeat(text_len),
            count: count.into(),
            existing_flashcards: None,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let valid = validate(request(1000, 3)).unwrap();
        assert_eq!(valid.count(), 3);
        assert_eq!(valid.text().len(), 1000);
    }

    #[test]
    fn test_text_too_short() {
        let err = validate(request(999, 3)).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "text");
        assert!(err.issues[0].message.contains("at least 1000"));
    }

    #[test]
    fn test_text_too_long() {
        let err = validate(request(10001, 3)).unwrap_err();
        assert_eq!(err.issues[0].path, "text");
        assert!(err.issues[0].message.contains("cannot exceed 10000"));
    }

    #[test]
    fn test_count_out_of_bounds() {
        let err = validate(request(1000, 0)).unwrap_err();
        assert_eq!(err.issues[0].path, "count");

        let err = validate(request(1000, 201)).unwrap_err();
        assert_eq!(err.issues[0].path, "count");
        assert!(err.issues[0].message.contains("more than 200"));
    }

    #[test]
    fn test_non_integer_count_tagged_on_count() {
        let mut req = request(1000, 1);
        req.count = serde_json::Number::from_f64(2.5).unwrap();

        let err = validate(req).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "count");
        assert!(err.issues[0].message.contains("integer"));
    }

    #[test]
    fn test_negative_count_tagged_on_count() {
        let mut req = request(1000, 1);
        req.count = serde_json::Number::from(-3);

        let err = validate(req).unwrap_err();
        assert_eq!(err.issues[0].path, "count");
        assert!(err.issues[0].message.contains("at least 1"));
    }

    #[test]
    fn test_all_violations_reported() {
        let err = validate(request(10, 0)).unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["text", "count"]);
    }

    #[test]
    fn test_existing_flashcards_bounds() {
        let mut req = request(1000, 3);
        req.existing_flashcards = Some(vec![
            FlashcardProposal::new("ok", "ok"),
            FlashcardProposal::new("q".repeat(201), "a".repeat(501)),
        ]);

        let err = validate(req).unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["existingFlashcards[1].front", "existingFlashcards[1].back"]
        );
    }

    #[test]
    fn test_char_counts_not_byte_counts() {
        // 1000 multi-byte characters is within bounds even though the
        // byte length is larger.
        let req = GenerateRequest {
            text: "é".repeat(1000),
            count: 1u32.into(),
            existing_flashcards: None,
        };
        assert!(validate(req).is_ok());
    }
}
