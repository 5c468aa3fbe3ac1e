//! # Compliance Checklist
//!
//! AI product questions and the answers collected on step two.
//!
//! Answers are keyed by a sanitized question key (`q_<id>`) so they can be
//! stored in flat form state. A question is a yes/no question when its type
//! mentions both "yes" and "no"; otherwise its options come from the
//! comma-separated response value. Questions whose text contains
//! "select all" accept several options.

use crate::payload::ChecklistItem;
use crate::primitives::MULTI_ANSWER_SEPARATOR;
use crate::reference::QuestionItem;
use crate::types::QuestionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Build the form key for a question identifier.
///
/// Every character that is not ASCII alphanumeric becomes `_`.
#[must_use]
pub fn sanitize_question_key(raw_id: &str) -> String {
    let body: String = raw_id
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("q_{body}")
}

// =============================================================================
// QUESTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionKind {
    YesNo,
    Choice,
}

/// A parsed checklist question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistQuestion {
    /// `None` for questions the backend sent without a numeric id; those
    /// are shown but never submitted.
    pub id: Option<QuestionId>,
    pub key: String,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub multi_select: bool,
}

impl ChecklistQuestion {
    /// Parse one mapping item.
    #[must_use]
    pub fn parse(item: &QuestionItem) -> Self {
        let question_type = item.question_type.to_lowercase();
        let kind = if question_type.contains("yes") && question_type.contains("no") {
            QuestionKind::YesNo
        } else {
            QuestionKind::Choice
        };
        let options = match kind {
            QuestionKind::YesNo => vec!["Yes".to_string(), "No".to_string()],
            QuestionKind::Choice => {
                let mut options: Vec<String> = Vec::new();
                for option in item.response_value.split(',').map(str::trim) {
                    if !option.is_empty() && !options.iter().any(|o| o == option) {
                        options.push(option.to_string());
                    }
                }
                options
            }
        };
        let raw_key = item
            .id
            .map_or_else(|| item.question.clone(), |id| id.to_string());

        Self {
            id: item.id.map(QuestionId),
            key: sanitize_question_key(&raw_key),
            text: item.question.trim().to_string(),
            kind,
            options,
            multi_select: kind == QuestionKind::Choice
                && item.question.to_lowercase().contains("select all"),
        }
    }

    /// Parse and order every question: by numeric id, id-less questions last
    /// in their delivered order.
    #[must_use]
    pub fn from_reference(items: &[QuestionItem]) -> Vec<Self> {
        let mut questions: Vec<Self> = items
            .iter()
            .filter(|item| !item.question.trim().is_empty())
            .map(Self::parse)
            .collect();
        // Stable sort keeps the delivered order among id-less questions.
        questions.sort_by_key(|q| (q.id.is_none(), q.id));
        questions
    }
}

// =============================================================================
// ANSWERS
// =============================================================================

/// A single or multi-select answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChecklistResponse {
    Single(String),
    Multi(Vec<String>),
}

impl ChecklistResponse {
    #[must_use]
    pub fn is_answered(&self) -> bool {
        match self {
            Self::Single(value) => !value.trim().is_empty(),
            Self::Multi(values) => values.iter().any(|v| !v.trim().is_empty()),
        }
    }

    /// Flatten to the string sent to the backend.
    #[must_use]
    pub fn flatten(&self) -> String {
        match self {
            Self::Single(value) => value.trim().to_string(),
            Self::Multi(values) => values
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(MULTI_ANSWER_SEPARATOR),
        }
    }
}

/// Answers keyed by sanitized question key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistAnswers {
    responses: BTreeMap<String, ChecklistResponse>,
}

impl ChecklistAnswers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, response: ChecklistResponse) {
        self.responses.insert(key.to_string(), response);
    }

    /// Toggle one option of a multi-select answer.
    pub fn toggle(&mut self, key: &str, option: &str) {
        let entry = self
            .responses
            .entry(key.to_string())
            .or_insert_with(|| ChecklistResponse::Multi(Vec::new()));
        if let ChecklistResponse::Single(value) = entry {
            let existing = std::mem::take(value);
            let seed = if existing.trim().is_empty() {
                Vec::new()
            } else {
                vec![existing]
            };
            *entry = ChecklistResponse::Multi(seed);
        }
        if let ChecklistResponse::Multi(values) = entry {
            if let Some(pos) = values.iter().position(|v| v == option) {
                values.remove(pos);
            } else {
                values.push(option.to_string());
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ChecklistResponse> {
        self.responses.get(key)
    }

    /// Number of non-empty answers.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.responses.values().filter(|r| r.is_answered()).count()
    }

    /// Build the `checklist[]` payload entries, in question order.
    ///
    /// Blank answers and questions without a numeric id are omitted.
    #[must_use]
    pub fn to_payload(&self, questions: &[ChecklistQuestion]) -> Vec<ChecklistItem> {
        questions
            .iter()
            .filter_map(|question| {
                let id = question.id?;
                let response = self.responses.get(&question.key)?;
                response.is_answered().then(|| ChecklistItem {
                    question_id: id,
                    response: response.flatten(),
                })
            })
            .collect()
    }
}
