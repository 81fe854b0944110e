#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Pool a question is drawn from.
///
/// Lucky-draw questions only become eligible once a session has unlocked them,
/// and answering one correctly on the first attempt triggers a prize draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "normal"))]
    Normal,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "lucky"))]
    Lucky,
}

impl QuestionCategory {
    pub const ALL: &'static [QuestionCategory] = &[Self::Normal, Self::Lucky];

    pub fn is_lucky(&self) -> bool {
        matches!(self, Self::Lucky)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Lucky => "lucky",
        }
    }
}

impl fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "lucky" => Ok(Self::Lucky),
            _ => Err(ParseEnumError::new(
                s,
                Self::ALL.iter().map(|c| c.as_str()).collect(),
            )),
        }
    }
}

/// How an answer to a question is shaped and graded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// One option id, e.g. `"b"`.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "single_choice"))]
    SingleChoice,
    /// Ordered list of option ids, e.g. `["a", "c"]`.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "multiple_choice"))]
    MultipleChoice,
    /// A JSON boolean.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "true_false"))]
    TrueFalse,
    /// A string compared after trimming surrounding whitespace.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "free_text"))]
    FreeText,
}

impl QuestionType {
    pub const ALL: &'static [QuestionType] = &[
        Self::SingleChoice,
        Self::MultipleChoice,
        Self::TrueFalse,
        Self::FreeText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleChoice => "single_choice",
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
            Self::FreeText => "free_text",
        }
    }

    /// Grade a submitted value against the canonical answer.
    ///
    /// Structured answers must match exactly (including array order).
    /// Free text ignores leading and trailing whitespace but is case-sensitive.
    pub fn is_correct(&self, submitted: &Value, canonical: &Value) -> bool {
        match self {
            Self::FreeText => match (submitted.as_str(), canonical.as_str()) {
                (Some(given), Some(expected)) => given.trim() == expected.trim(),
                _ => false,
            },
            Self::SingleChoice | Self::MultipleChoice | Self::TrueFalse => submitted == canonical,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_choice" => Ok(Self::SingleChoice),
            "multiple_choice" => Ok(Self::MultipleChoice),
            "true_false" => Ok(Self::TrueFalse),
            "free_text" => Ok(Self::FreeText),
            _ => Err(ParseEnumError::new(
                s,
                Self::ALL.iter().map(|t| t.as_str()).collect(),
            )),
        }
    }
}

/// Error when parsing an unknown enum string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value '{invalid}'. Valid values: {}", .valid.join(", "))]
pub struct ParseEnumError {
    invalid: String,
    valid: Vec<&'static str>,
}

impl ParseEnumError {
    pub(crate) fn new(invalid: &str, valid: Vec<&'static str>) -> Self {
        Self {
            invalid: invalid.to_string(),
            valid,
        }
    }
}
