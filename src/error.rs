use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "geocoder.user_agent")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "rate_limiter", "batch_executor")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// What went wrong while talking to an external provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Connection refused, DNS failure, request timeout.
    Network,
    /// Non-2xx HTTP status.
    Status(u16),
    /// HTTP 429; `retry_after_secs` mirrors the `Retry-After` header when present.
    RateLimited { retry_after_secs: Option<u64> },
    /// Response body did not match the expected shape.
    Parse,
    /// The provider answered but had no data (address or elevation not found).
    NotFound,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::Network => write!(f, "network"),
            ProviderErrorKind::Status(code) => write!(f, "HTTP {}", code),
            ProviderErrorKind::RateLimited {
                retry_after_secs: Some(secs),
            } => write!(f, "rate limited (retry after {}s)", secs),
            ProviderErrorKind::RateLimited { retry_after_secs: None } => write!(f, "rate limited"),
            ProviderErrorKind::Parse => write!(f, "malformed response"),
            ProviderErrorKind::NotFound => write!(f, "not found"),
        }
    }
}

/// Unified error type for batch execution, caching, rate limiting and providers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Admission timeout: no rate limiter token within {waited_ms}ms{}", format_context(.context))]
    AdmissionTimeout { waited_ms: u64, context: ErrorContext },

    #[error("Provider error ({provider}, {kind}): {message}")]
    Provider {
        provider: String,
        kind: ProviderErrorKind,
        message: String,
    },

    #[error("Task {index} failed{}: {source}", format_input(.input))]
    Task {
        index: usize,
        input: Option<String>,
        source: Box<Error>,
    },

    #[error("In-flight lookup for '{key}' failed: {source}")]
    Coalesced { key: String, source: Arc<Error> },

    #[error("Cancelled: batch already failed{}", format_context(.context))]
    Cancelled { context: ErrorContext },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_input(input: &Option<String>) -> String {
    match input {
        Some(i) => format!(" (input: {})", i),
        None => String::new(),
    }
}

impl Error {
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::runtime_with_context(msg, ErrorContext::new())
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn provider(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        msg: impl Into<String>,
    ) -> Self {
        Error::Provider {
            provider: provider.into(),
            kind,
            message: msg.into(),
        }
    }

    pub fn not_found(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::provider(provider, ProviderErrorKind::NotFound, msg)
    }

    pub fn admission_timeout(waited: Duration, source: impl Into<String>) -> Self {
        Error::AdmissionTimeout {
            waited_ms: waited.as_millis() as u64,
            context: ErrorContext::new().with_source(source),
        }
    }

    pub fn cancelled(source: impl Into<String>) -> Self {
        Error::Cancelled {
            context: ErrorContext::new().with_source(source),
        }
    }

    /// Wrap a task failure with its position (and optionally a rendering of its input).
    pub fn task(index: usize, input: Option<String>, source: Error) -> Self {
        Error::Task {
            index,
            input,
            source: Box::new(source),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Runtime { context, .. }
            | Error::AdmissionTimeout { context, .. }
            | Error::Cancelled { context } => Some(context),
            _ => None,
        }
    }

    /// Index of the failed task, for errors reported by a batch.
    pub fn task_index(&self) -> Option<usize> {
        match self {
            Error::Task { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The innermost error, looking through task and single-flight wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Task { source, .. } => source.root(),
            Error::Coalesced { source, .. } => source.root(),
            other => other,
        }
    }

    /// The caller was throttled out locally, as opposed to the remote call failing.
    pub fn is_admission_timeout(&self) -> bool {
        matches!(self.root(), Error::AdmissionTimeout { .. })
    }

    pub fn is_provider_failure(&self) -> bool {
        matches!(self.root(), Error::Provider { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            Error::Provider {
                kind: ProviderErrorKind::NotFound,
                ..
            }
        )
    }

    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self.root() {
            Error::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
