use ggez::GameError;
use std::fmt::{Debug, Display, Formatter};
use std::{fmt, io, result};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ErrorType {
    #[error("graphics: {0}")]
    GameError(#[from] GameError),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("store: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid time: {0}")]
    InvalidTime(#[from] chrono::ParseError),

    /// The backend could not be reached or failed to answer,
    /// this is the only kind that is worth retrying
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("not allowed: {0}")]
    Unauthorized(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not an image file: {0}")]
    InvalidFileType(String),
}

/// The second member contains a trace in reverse order
#[must_use]
pub struct Error(ErrorType, Vec<String>);

impl From<ErrorType> for Error {
    fn from(e: ErrorType) -> Self {
        Self(e, vec![])
    }
}

macro_rules! impl_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for Error {
                fn from(e: $source) -> Self {
                    Self(ErrorType::from(e), vec![])
                }
            }
        )*
    };
}

impl_from!(GameError, io::Error, serde_json::Error, toml::de::Error, chrono::ParseError);

impl Error {
    #[cfg(test)]
    pub fn kind(&self) -> &ErrorType {
        &self.0
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.0, ErrorType::Unavailable(_))
    }

    pub fn with_trace_step<S: ToString>(mut self, s: S) -> Self {
        self.1.push(s.to_string());
        self
    }

    /// Short form for notifications, without the trace
    pub fn message(&self) -> String {
        self.0.to_string()
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error:\n{:?}\nTrace:", self.0)?;
        for t in (self.1).iter().rev() {
            writeln!(f, " in {}", t)?;
        }
        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        if let Some(step) = self.1.last() {
            write!(f, " (in {})", step)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

// ggez needs to turn our errors back into its own when the event loop fails
impl From<Error> for GameError {
    fn from(e: Error) -> Self {
        GameError::CustomError(e.to_string())
    }
}

pub type Result<T = ()> = result::Result<T, Error>;

pub trait ErrorConversion {
    fn with_trace_step<S: ToString>(self, s: S) -> Self;
}

impl<T> ErrorConversion for Result<T> {
    fn with_trace_step<S: ToString>(self, s: S) -> Self {
        self.map_err(|e| e.with_trace_step(s.to_string()))
    }
}

#[test]
fn test_trace_order() {
    let result: Result = Err(Error::from(ErrorType::Unavailable("timeout".into())));
    let e = result
        .with_trace_step("inner")
        .with_trace_step("outer")
        .unwrap_err();

    assert!(e.is_transient());
    assert_eq!(e.to_string(), "backend unavailable: timeout (in outer)");
    let debug = format!("{:?}", e);
    let outer = debug.find("in outer").unwrap();
    let inner = debug.find("in inner").unwrap();
    assert!(outer < inner, "trace should list the outermost step first:\n{}", debug);
}
