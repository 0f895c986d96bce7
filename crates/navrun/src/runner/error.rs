//! Error taxonomy and the diagnostics collection shared by every stage.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub type RunResult<T> = Result<T, RunError>;

/// Broad class of a failure, used to pick the user-facing category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Malformed input caught before anything is staged.
    Validation,
    /// The host is not ready to run the navigator.
    Preflight,
    /// The run directory or one of its files could not be prepared.
    Staging,
    /// The navigator exited unsuccessfully for a reason other than a deadline.
    Execution,
    /// The navigator exceeded its deadline.
    Timeout,
    /// The run finished but its results could not be extracted.
    PostProcessing,
}

impl ErrorClass {
    /// Process exit code the CLI uses for a failure of this class.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Validation => 2,
            Self::Preflight => 3,
            Self::Staging => 4,
            Self::Execution => 5,
            Self::Timeout => 6,
            Self::PostProcessing => 7,
        }
    }
}

/// Stable machine-readable error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "E_PRIVATE_KEY")]
    PrivateKey,
    #[serde(rename = "E_KNOWN_HOST")]
    KnownHost,
    #[serde(rename = "E_FILTER_SYNTAX")]
    FilterSyntax,
    #[serde(rename = "E_INVALID_NAME")]
    InvalidName,
    #[serde(rename = "E_PREFLIGHT_WORKING_DIRECTORY")]
    WorkingDirectory,
    #[serde(rename = "E_PREFLIGHT_ENGINE_NOT_FOUND")]
    EngineNotFound,
    #[serde(rename = "E_PREFLIGHT_ENGINE_AMBIGUOUS")]
    EngineAmbiguous,
    #[serde(rename = "E_PREFLIGHT_ENGINE_UNUSABLE")]
    EngineUnusable,
    #[serde(rename = "E_PREFLIGHT_PLAYBOOK_UNAVAILABLE")]
    PlaybookUnavailable,
    #[serde(rename = "E_PREFLIGHT_NAVIGATOR_NOT_FOUND")]
    NavigatorNotFound,
    #[serde(rename = "E_PREFLIGHT_NAVIGATOR_NOT_FUNCTIONAL")]
    NavigatorNotFunctional,
    #[serde(rename = "E_RUN_DIRECTORY")]
    RunDirectory,
    #[serde(rename = "E_SETTINGS")]
    Settings,
    #[serde(rename = "E_IO")]
    Io,
    #[serde(rename = "E_SPAWN")]
    Spawn,
    #[serde(rename = "E_EXECUTION")]
    Execution,
    #[serde(rename = "E_TIMEOUT")]
    Timeout,
    #[serde(rename = "E_ARTIFACT")]
    Artifact,
    #[serde(rename = "E_QUERY")]
    Query,
    #[serde(rename = "E_KNOWN_HOSTS_READ")]
    KnownHostsRead,
    #[serde(rename = "E_CLEANUP")]
    Cleanup,
    #[serde(rename = "E_SPEC")]
    Spec,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrivateKey => "E_PRIVATE_KEY",
            Self::KnownHost => "E_KNOWN_HOST",
            Self::FilterSyntax => "E_FILTER_SYNTAX",
            Self::InvalidName => "E_INVALID_NAME",
            Self::WorkingDirectory => "E_PREFLIGHT_WORKING_DIRECTORY",
            Self::EngineNotFound => "E_PREFLIGHT_ENGINE_NOT_FOUND",
            Self::EngineAmbiguous => "E_PREFLIGHT_ENGINE_AMBIGUOUS",
            Self::EngineUnusable => "E_PREFLIGHT_ENGINE_UNUSABLE",
            Self::PlaybookUnavailable => "E_PREFLIGHT_PLAYBOOK_UNAVAILABLE",
            Self::NavigatorNotFound => "E_PREFLIGHT_NAVIGATOR_NOT_FOUND",
            Self::NavigatorNotFunctional => "E_PREFLIGHT_NAVIGATOR_NOT_FUNCTIONAL",
            Self::RunDirectory => "E_RUN_DIRECTORY",
            Self::Settings => "E_SETTINGS",
            Self::Io => "E_IO",
            Self::Spawn => "E_SPAWN",
            Self::Execution => "E_EXECUTION",
            Self::Timeout => "E_TIMEOUT",
            Self::Artifact => "E_ARTIFACT",
            Self::Query => "E_QUERY",
            Self::KnownHostsRead => "E_KNOWN_HOSTS_READ",
            Self::Cleanup => "E_CLEANUP",
            Self::Spec => "E_SPEC",
        }
    }

    /// Map a code onto the error taxonomy.
    pub fn class(self) -> ErrorClass {
        match self {
            Self::PrivateKey
            | Self::KnownHost
            | Self::FilterSyntax
            | Self::InvalidName
            | Self::Spec => ErrorClass::Validation,
            Self::WorkingDirectory
            | Self::EngineNotFound
            | Self::EngineAmbiguous
            | Self::EngineUnusable
            | Self::PlaybookUnavailable
            | Self::NavigatorNotFound
            | Self::NavigatorNotFunctional => ErrorClass::Preflight,
            Self::RunDirectory | Self::Settings | Self::Io | Self::Cleanup => ErrorClass::Staging,
            Self::Spawn | Self::Execution => ErrorClass::Execution,
            Self::Timeout => ErrorClass::Timeout,
            Self::Artifact | Self::Query | Self::KnownHostsRead => ErrorClass::PostProcessing,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RunError {
    pub code: ErrorCode,
    pub message: String,
    pub context: Option<Value>,
}

impl RunError {
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        context: impl Into<Option<Value>>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            context: context.into(),
        }
    }

    pub fn validation(
        code: ErrorCode,
        message: impl Into<String>,
        context: impl Into<Option<Value>>,
    ) -> Self {
        Self::new(code, message, context)
    }

    pub fn preflight(
        code: ErrorCode,
        message: impl Into<String>,
        context: impl Into<Option<Value>>,
    ) -> Self {
        Self::new(code, message, context)
    }

    pub fn staging(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::RunDirectory, message, context)
    }

    pub fn execution(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::Execution, message, context)
    }

    pub fn timeout(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::Timeout, message, context)
    }

    pub fn post_processing(
        code: ErrorCode,
        message: impl Into<String>,
        context: impl Into<Option<Value>>,
    ) -> Self {
        Self::new(code, message, context)
    }

    /// Wrap an underlying I/O (or other displayable) failure.
    pub fn io(code: ErrorCode, message: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::new(
            code,
            message,
            Some(serde_json::json!({ "source": err.to_string() })),
        )
    }

    pub fn class(&self) -> ErrorClass {
        self.code.class()
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code,
            class: self.code.class(),
            message: self.message.clone(),
            context: self.context.clone(),
        }
    }
}

impl Diagnostic for RunError {}

/// Serializable snapshot of a [`RunError`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub class: ErrorClass,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Errors and warnings accumulated over one run.
///
/// Checks report here instead of short-circuiting so a single pass surfaces
/// every problem the caller can fix.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default)]
    pub errors: Vec<ErrorInfo>,
    #[serde(default)]
    pub warnings: Vec<ErrorInfo>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, err: &RunError) {
        self.errors.push(err.to_error_info());
    }

    pub fn push_warning(&mut self, err: &RunError) {
        self.warnings.push(err.to_error_info());
    }

    /// Record the error of a failed step and hand back its value otherwise.
    pub fn record<T>(&mut self, result: RunResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.push_error(&err);
                None
            }
        }
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_class(&self, class: ErrorClass) -> bool {
        self.errors.iter().any(|err| err.class == class)
    }

    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|err| err.code == code)
    }
}

