use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("note not found: {0}")]
    NoteNotFound(String),
    #[error("invalid note name: {0}")]
    InvalidNoteName(String),
    #[error("io failure: {0}")]
    Io(String),
    #[error("frontmatter: {0}")]
    Frontmatter(String),
}

impl From<std::io::Error> for TimelineError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_yaml::Error> for TimelineError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Frontmatter(value.to_string())
    }
}

pub type TimelineResult<T> = Result<T, TimelineError>;
