use core::fmt::{Display, Formatter, Result as FmtResult};
use core::result::Result as CoreResult;
use core::str::FromStr;

use serde::de::{Deserializer, Error as DeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::Error;

/// Highest score an evaluation can award.
pub const MAX_MARKS: u8 = 10;

/// Feedback used when the grading model's output could not be parsed.
pub const INVALID_EVALUATION_FEEDBACK: &str = "Invalid evaluation response received.";

/// A bounded segment of source text, the unit of embedding and retrieval.
///
/// `text` is always an exact slice of the text it was cut from, starting at
/// byte offset `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk content
    pub text: String,
    /// Position of the chunk in the sequence produced by the chunker
    pub order: usize,
    /// Byte offset of `text` within the source text
    pub start: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(text: impl Into<String>, order: usize, start: usize) -> Self {
        Self {
            text: text.into(),
            order,
            start,
        }
    }

    /// Byte offset one past the end of this chunk in the source text
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// Length in characters
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Kind of question requested from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuestionType {
    /// Multiple choice with four options
    #[default]
    #[serde(rename = "MCQ")]
    Mcq,
    /// True or false statement
    #[serde(rename = "True/False")]
    TrueFalse,
    /// Fill in the blanks
    #[serde(rename = "Fill in the blanks")]
    FillInTheBlanks,
    /// Short free-form answer
    #[serde(rename = "Short Answer")]
    ShortAnswer,
    /// Long free-form answer
    #[serde(rename = "Long Answer")]
    LongAnswer,
    /// Essay
    #[serde(rename = "Essay")]
    Essay,
}

impl QuestionType {
    /// Every supported question type, in menu order.
    pub const ALL: [Self; 6] = [
        Self::Mcq,
        Self::TrueFalse,
        Self::FillInTheBlanks,
        Self::ShortAnswer,
        Self::LongAnswer,
        Self::Essay,
    ];

    /// Label substituted into the generation prompt.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mcq => "MCQ",
            Self::TrueFalse => "True/False",
            Self::FillInTheBlanks => "Fill in the blanks",
            Self::ShortAnswer => "Short Answer",
            Self::LongAnswer => "Long Answer",
            Self::Essay => "Essay",
        }
    }
}

impl Display for QuestionType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.label())
    }
}

impl FromStr for QuestionType {
    type Err = Error;

    fn from_str(value: &str) -> CoreResult<Self, Self::Err> {
        let normalized: String = value
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|ch| ch.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "mcq" | "multiplechoice" => Ok(Self::Mcq),
            "truefalse" | "tf" => Ok(Self::TrueFalse),
            "fillintheblanks" | "fillintheblank" | "blanks" => Ok(Self::FillInTheBlanks),
            "shortanswer" | "short" => Ok(Self::ShortAnswer),
            "longanswer" | "long" => Ok(Self::LongAnswer),
            "essay" => Ok(Self::Essay),
            _ => Err(Error::Config(format!("Unknown question type: {value}"))),
        }
    }
}

/// Reasons a JSON element cannot be read as a [`Question`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// The element is not a JSON object.
    #[error("question entry is not a JSON object")]
    NotAnObject,
    /// `question` is missing, not a string, or blank.
    #[error("question entry has no question text")]
    MissingQuestion,
    /// Both `options` and `reason_required` are present.
    #[error("question entry has both options and reason_required")]
    AmbiguousVariant,
    /// `options` is not an array of strings.
    #[error("options must be an array of strings")]
    InvalidOptions,
    /// `options` holds the wrong number of entries.
    #[error("multiple choice questions need exactly 4 options, got {0}")]
    OptionCount(usize),
    /// `reason_required` is not a boolean.
    #[error("reason_required must be a boolean")]
    InvalidReasonFlag,
}

/// A generated exam question.
///
/// Serializes to the wire format consumers expect: `question` plus exactly
/// one of `options` or `reason_required`, or neither for open questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Question {
    /// Multiple choice question
    Mcq {
        /// Question text
        question: String,
        /// The four answer options, in display order
        options: [String; 4],
    },
    /// True/false statement
    TrueFalse {
        /// Statement text
        question: String,
        /// Whether the answer must be justified
        reason_required: bool,
    },
    /// Free-form question
    OpenAnswer {
        /// Question text
        question: String,
    },
}

impl Question {
    /// Question text, whatever the variant
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Mcq { question, .. }
            | Self::TrueFalse { question, .. }
            | Self::OpenAnswer { question } => question,
        }
    }

    /// Options of a multiple choice question
    #[must_use]
    pub fn options(&self) -> Option<&[String; 4]> {
        match self {
            Self::Mcq { options, .. } => Some(options),
            Self::TrueFalse { .. } | Self::OpenAnswer { .. } => None,
        }
    }
}

impl TryFrom<Value> for Question {
    type Error = ShapeError;

    fn try_from(value: Value) -> CoreResult<Self, Self::Error> {
        let Value::Object(mut object) = value else {
            return Err(ShapeError::NotAnObject);
        };

        let question = match object.remove("question") {
            Some(Value::String(text)) if !text.trim().is_empty() => text,
            _ => return Err(ShapeError::MissingQuestion),
        };

        match (object.remove("options"), object.remove("reason_required")) {
            (Some(_), Some(_)) => Err(ShapeError::AmbiguousVariant),
            (Some(options), None) => Ok(Self::Mcq {
                question,
                options: parse_options(options)?,
            }),
            (None, Some(Value::Bool(reason_required))) => Ok(Self::TrueFalse {
                question,
                reason_required,
            }),
            (None, Some(_)) => Err(ShapeError::InvalidReasonFlag),
            (None, None) => Ok(Self::OpenAnswer { question }),
        }
    }
}

impl<'de> Deserialize<'de> for Question {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> CoreResult<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(DeError::custom)
    }
}

fn parse_options(value: Value) -> CoreResult<[String; 4], ShapeError> {
    let Value::Array(items) = value else {
        return Err(ShapeError::InvalidOptions);
    };
    let count = items.len();
    let texts = items
        .into_iter()
        .map(|item| match item {
            Value::String(text) => Ok(text),
            _ => Err(ShapeError::InvalidOptions),
        })
        .collect::<CoreResult<Vec<_>, _>>()?;

    <[String; 4]>::try_from(texts).map_err(|_| ShapeError::OptionCount(count))
}

/// Score and feedback for one answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Marks awarded, 0 to [`MAX_MARKS`]
    pub marks: u8,
    /// One-sentence feedback from the grader
    pub feedback: String,
}

impl Evaluation {
    /// Create an evaluation, clamping `marks` to [`MAX_MARKS`]
    pub fn new(marks: u8, feedback: impl Into<String>) -> Self {
        Self {
            marks: marks.min(MAX_MARKS),
            feedback: feedback.into(),
        }
    }

    /// The substitute used when the grader's output is unparseable
    #[must_use]
    pub fn invalid_response() -> Self {
        Self::new(0, INVALID_EVALUATION_FEEDBACK)
    }
}

/// Text returned by a model invocation, with accounting details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text
    pub text: String,
    /// Provider and model that produced the text
    pub provider: String,
    /// Token accounting, when the provider reports it
    pub tokens_used: TokenUsage,
    /// Wall-clock latency of the call
    pub latency_ms: u64,
}

impl Completion {
    /// Completion carrying only text, for providers without accounting
    pub fn from_text(text: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            tokens_used: TokenUsage::default(),
            latency_ms: 0,
        }
    }
}

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input: u64,
    /// Completion tokens
    pub output: u64,
}

impl TokenUsage {
    /// Sum of prompt and completion tokens
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}
