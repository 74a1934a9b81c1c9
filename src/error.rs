use polars::prelude::PolarsError;
use std::io;
use thiserror::Error;

/**
Result type to simplify function signatures.

This is a custom result type that uses our custom `ExplorerError` for the error type.

Functions can return `ExplorerResult<T>` and then use `?` to automatically propagate errors.
*/
pub type ExplorerResult<T> = Result<T, ExplorerError>;

/// Generic guidance shown for any failure talking to the warehouse.
///
/// The raw failure is logged, never displayed: it may carry credential fragments
/// or internal detail the user cannot act on.
const WAREHOUSE_GUIDANCE: &str = "\
Something went wrong while processing your request.

This may be due to:
- Temporary connection issues
- Missing or invalid credentials
- Insufficient permissions
- An unexpected BigQuery response

Please try again or contact the app administrator if the issue persists.";

/**
Custom error type for BigQuery Explorer.

The first four variants are the user-facing kinds: every component boundary converts
whatever went wrong underneath into one of them. The remaining variants wrap
infrastructure errors so that `?` works inside the components.

We use the `thiserror` crate to derive the `Error` trait and automatically
implement `Display` using the `#[error(...)]` attribute.
*/
#[derive(Error, Debug)]
pub enum ExplorerError {
    // --- User-facing kinds ---
    /// Malformed or rejected key material. The user re-enters the key.
    #[error("Invalid credentials: {0}")]
    Credential(String),

    /// An operation that needs a warehouse client ran before one was saved.
    #[error("No BigQuery client available. Paste your BigQuery key in the sidebar to begin.")]
    NoClient,

    /// Remote call or response parsing failed. Displays only the redacted guidance.
    #[error("{guidance}\n\nContext: {context}", guidance = WAREHOUSE_GUIDANCE)]
    Query { context: String },

    /// A blank query was submitted; nothing was sent to the warehouse.
    #[error("Please enter a SQL query.")]
    EmptyInput,

    // --- Infrastructure errors ---
    // Wrapper for standard IO errors.
    // The #[from] attribute automatically converts io::Error to ExplorerError::Io.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Wrapper for Polars errors (building or inspecting result tables).
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    // Key documents and warehouse payloads are JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Transport-level failures from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Signing the service-account assertion failed (usually a bad private key).
    #[error("Token signing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The warehouse answered with an error document.
    #[error("BigQuery error {code}: {message}")]
    Warehouse { code: u16, message: String },

    // Errors occurring when receiving data from asynchronous channels.
    #[error("Channel receive error: {0}")]
    ChannelReceive(String),

    #[error("Invalid value for command-line argument '{arg_name}': {reason}")]
    InvalidArgument {
        arg_name: String, // Context about *which* argument failed
        reason: String,   // The specific error reason
    },

    // A catch-all for other, less specific errors not covered by specific variants.
    #[error("Other error: {0}")]
    Other(String),
}

impl ExplorerError {
    /// Wraps any failure behind the redacted `Query` kind, logging the raw detail.
    ///
    /// `context` names what was being attempted ("Running SQL query",
    /// "Loading dataset schema", ...) and is the only specific part the user sees.
    pub fn redacted(context: &str, source: &ExplorerError) -> ExplorerError {
        tracing::error!("{context} failed: {source}");
        ExplorerError::Query {
            context: context.to_string(),
        }
    }
}

// Implementation of the From trait to convert a String into an ExplorerError.
impl From<String> for ExplorerError {
    fn from(err: String) -> ExplorerError {
        // Prefer using specific error variants when possible, fallback to Other.
        ExplorerError::Other(err)
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//
