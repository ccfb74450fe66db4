use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("naming error: {0}")]
    Naming(String),

    #[error("hash mismatch for {subject}: expected {expected}, actual {actual}")]
    HashMismatch {
        subject: String,
        expected: String,
        actual: String,
    },

    #[error("archive structure error: {0}")]
    ArchiveStructure(String),

    #[error(
        "external tool failed: {command} returned {}{}",
        exit_status_text(.status),
        stderr_suffix(.stderr)
    )]
    ExternalTool {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("resource error: {path}: {reason}")]
    Resource { path: String, reason: String },

    #[error("digest error: {0}")]
    Digest(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn resource(path: impl AsRef<std::path::Path>, reason: impl Into<String>) -> Self {
        CoreError::Resource {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }
}

fn exit_status_text(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no exit status".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(" ({})", stderr)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
