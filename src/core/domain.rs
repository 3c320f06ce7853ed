use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    C,
    Cpp,
    Java,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::JavaScript,
        Language::C,
        Language::Cpp,
        Language::Java,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "python3"],
            Language::JavaScript => &["js", "node"],
            Language::C => &[],
            Language::Cpp => &["c++", "cxx", "cc"],
            Language::Java => &[],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Language '{0}' is not supported")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(identifier: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| {
                language.identifier().eq_ignore_ascii_case(identifier)
                    || language
                        .aliases()
                        .iter()
                        .any(|alias| alias.eq_ignore_ascii_case(identifier))
            })
            .ok_or_else(|| UnsupportedLanguage(identifier.to_lowercase()))
    }
}

fn default_language() -> String {
    Language::Python.identifier().to_string()
}

/// A single submission. Immutable once handed to the executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, rename = "input_data")]
    pub input: Option<String>,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            input: None,
        }
    }

    pub fn with_input(self, input: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            ..self
        }
    }

    pub fn stdin(&self) -> &str {
        self.input.as_deref().unwrap_or("")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedLanguage,
    CompileFailure,
    LaunchFailure,
    RuntimeFailure,
    Timeout,
    InternalError,
}

impl FailureKind {
    /// Deterministic failures reproduce on every attempt with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Timeout | FailureKind::InternalError)
    }
}

/// Result of one execution request.
///
/// Either `success` is set and `error` is empty, or `success` is false and
/// `error` carries a human-readable reason. `output` may accompany both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    /// Wall-clock seconds.
    pub execution_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ExecutionOutcome {
    pub fn success(output: String, elapsed: Duration) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
            execution_time: elapsed.as_secs_f64(),
            failure: None,
        }
    }

    pub fn failure(
        kind: FailureKind,
        error: impl Into<String>,
        output: Option<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: false,
            output: output.filter(|output| !output.is_empty()),
            error: Some(error.into()),
            execution_time: elapsed.as_secs_f64(),
            failure: Some(kind),
        }
    }

    pub fn unsupported(error: &UnsupportedLanguage) -> Self {
        Self::failure(
            FailureKind::UnsupportedLanguage,
            error.to_string(),
            None,
            Duration::ZERO,
        )
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::failure(FailureKind::InternalError, msg, None, Duration::ZERO)
    }

    pub fn is_retryable(&self) -> bool {
        self.failure.is_some_and(|kind| kind.is_retryable())
    }
}

/// Stages an execution moves through, used for tracing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionState {
    Received,
    LanguageResolved,
    Building,
    Built,
    BuildFailed,
    Running,
    Completed,
    TimedOut,
    RunFailed,
    Cleaned,
}

impl ExecutionState {
    /// Terminal state of an execution whose run step produced `outcome`.
    /// Build-step failures always end in [`ExecutionState::BuildFailed`].
    pub fn after_run(outcome: &ExecutionOutcome) -> Self {
        match outcome.failure {
            None => ExecutionState::Completed,
            Some(FailureKind::Timeout) => ExecutionState::TimedOut,
            Some(_) => ExecutionState::RunFailed,
        }
    }
}
