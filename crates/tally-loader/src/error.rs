use std::fmt;

#[derive(Debug)]
pub enum LoadError {
    Repository(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Repository(msg) => write!(f, "repository error: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}
