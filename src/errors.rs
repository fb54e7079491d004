//! Error types shared by every satchel tool
//!
//! Input problems (bad CSV rows, missing columns, broken launcher entries)
//! carry enough context to point the user at the offending line. Everything
//! else wraps the underlying library error.

use std::path::PathBuf;

/// How much of an offending row we echo back in an error message
const CONTEXT_LIMIT: usize = 160;

/// A problem in user-supplied data, with the location when we know it
#[derive(Debug)]
pub struct InputError {
    pub message: String,
    pub line: Option<usize>,
    pub context: Option<String>,
}

impl InputError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            context: None,
        }
    }

    pub fn at_line(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
            context: None,
        }
    }

    /// Attach an excerpt of the offending row, truncated to keep errors readable
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let mut ctx: String = context.into();
        if ctx.chars().count() > CONTEXT_LIMIT {
            ctx = ctx.chars().take(CONTEXT_LIMIT).collect::<String>() + "...";
        }
        self.context = Some(ctx);
        self
    }
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(line) = self.line {
            write!(f, " | line={}", line)?;
        }
        if let Some(ref ctx) = self.context {
            write!(f, " | row: {}", ctx)?;
        }
        Ok(())
    }
}

/// Error type covering all satchel operations
#[derive(Debug)]
pub enum ToolError {
    Input(InputError),
    Config(String),
    NotFound(PathBuf),
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Toml(toml::de::Error),
    Http(String),
    Watch(notify::Error),
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolError::Input(e) => write!(f, "{}", e),
            ToolError::Config(msg) => write!(f, "config error: {}", msg),
            ToolError::NotFound(path) => write!(f, "not found: {}", path.display()),
            ToolError::Io(e) => write!(f, "io error: {}", e),
            ToolError::Csv(e) => write!(f, "csv error: {}", e),
            ToolError::Json(e) => write!(f, "json error: {}", e),
            ToolError::Yaml(e) => write!(f, "yaml error: {}", e),
            ToolError::Toml(e) => write!(f, "toml error: {}", e),
            ToolError::Http(msg) => write!(f, "server error: {}", msg),
            ToolError::Watch(e) => write!(f, "watch error: {}", e),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<InputError> for ToolError {
    fn from(e: InputError) -> Self {
        ToolError::Input(e)
    }
}

impl From<std::io::Error> for ToolError {
    fn from(e: std::io::Error) -> Self {
        ToolError::Io(e)
    }
}

impl From<csv::Error> for ToolError {
    fn from(e: csv::Error) -> Self {
        ToolError::Csv(e)
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::Json(e)
    }
}

impl From<serde_yaml::Error> for ToolError {
    fn from(e: serde_yaml::Error) -> Self {
        ToolError::Yaml(e)
    }
}

impl From<toml::de::Error> for ToolError {
    fn from(e: toml::de::Error) -> Self {
        ToolError::Toml(e)
    }
}

impl From<notify::Error> for ToolError {
    fn from(e: notify::Error) -> Self {
        ToolError::Watch(e)
    }
}

pub type Result<T> = std::result::Result<T, ToolError>;
