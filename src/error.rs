use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a [`Level`](crate::level::Level) backend or a format reader.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("NBT error in {context}: {message}")]
    Nbt { context: String, message: String },
    #[error("Malformed {format} data: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },
    #[error("Unknown or unsupported level format: {0}")]
    UnsupportedFormat(String),
    #[error("Dimension {0} does not exist in this level")]
    UnknownDimension(String),
    #[error("Destination y range {low}..{high} lies outside the build height {min_y}..{max_y}")]
    OutOfBuildHeight {
        low: i32,
        high: i32,
        min_y: i32,
        max_y: i32,
    },
    #[error("Coordinate overflow while computing {0}")]
    CoordinateOverflow(&'static str),
    #[error("{0} is not supported by this level")]
    Unsupported(&'static str),
    #[error("Level has already been closed")]
    Closed,
}

impl LevelError {
    pub fn malformed(format: &'static str, message: impl Into<String>) -> Self {
        LevelError::Malformed {
            format,
            message: message.into(),
        }
    }
}

/// Attaches a location to NBT decoding failures.
pub(crate) trait NbtContext<T> {
    fn nbt_context(self, context: &str) -> Result<T, LevelError>;
}

impl<T, E: fmt::Display> NbtContext<T> for Result<T, E> {
    fn nbt_context(self, context: &str) -> Result<T, LevelError> {
        self.map_err(|e| LevelError::Nbt {
            context: context.to_string(),
            message: e.to_string(),
        })
    }
}

/// Why a schematic filename could not be decomposed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilenameError {
    #[error("path has no file name")]
    NoFileName,
    #[error("expected 6 underscore-separated integers (x_y_z_width_length_height), found {0} tokens")]
    TokenCount(usize),
    #[error("token {token:?} ({field}) is not an integer")]
    NotAnInteger { field: &'static str, token: String },
}

/// Which of the two handles a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelRole {
    World,
    Schematic,
}

impl fmt::Display for LevelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelRole::World => write!(f, "world"),
            LevelRole::Schematic => write!(f, "schematic"),
        }
    }
}

/// Fatal errors of a paste run, one variant per stage.
#[derive(Debug, Error)]
pub enum PasteError {
    #[error("No schematic path given")]
    NoSchematics,
    #[error("Invalid schematic filename {}", .path.display())]
    InvalidFilename {
        path: PathBuf,
        #[source]
        reason: FilenameError,
    },
    #[error("Coordinate overflow while computing {what} for {}", .path.display())]
    CoordinateOverflow { path: PathBuf, what: &'static str },
    #[error("Failed to open {role} at {}", .path.display())]
    LoadLevel {
        role: LevelRole,
        path: PathBuf,
        #[source]
        source: LevelError,
    },
    #[error("{role} at {} has no dimensions", .path.display())]
    NoDimensions { role: LevelRole, path: PathBuf },
    #[error("Failed to read bounds of {dimension} in {}", .path.display())]
    Bounds {
        path: PathBuf,
        dimension: String,
        #[source]
        source: LevelError,
    },
    #[error("Dimension {dimension} of {} has no selection boxes", .path.display())]
    EmptySelection { path: PathBuf, dimension: String },
    #[error("Failed to paste {}", .path.display())]
    Paste {
        path: PathBuf,
        #[source]
        source: LevelError,
    },
    #[error("Failed to save world at {}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: LevelError,
    },
    #[error("Failed to close {role} at {}", .path.display())]
    Close {
        role: LevelRole,
        path: PathBuf,
        #[source]
        source: LevelError,
    },
}

/// `err` followed by each of its causes, joined with `": "`.
pub fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_error_messages() {
        assert_eq!(
            FilenameError::TokenCount(5).to_string(),
            "expected 6 underscore-separated integers (x_y_z_width_length_height), found 5 tokens"
        );
        let err = FilenameError::NotAnInteger {
            field: "width",
            token: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "token \"abc\" (width) is not an integer");
    }

    #[test]
    fn test_paste_error_names_stage_and_path() {
        let err = PasteError::LoadLevel {
            role: LevelRole::World,
            path: PathBuf::from("/tmp/world"),
            source: LevelError::UnsupportedFormat("missing level.dat".to_string()),
        };
        assert_eq!(err.to_string(), "Failed to open world at /tmp/world");
        assert_eq!(
            error_chain(&err),
            "Failed to open world at /tmp/world: Unknown or unsupported level format: missing level.dat"
        );
    }

    #[test]
    fn test_nbt_context() {
        let result: Result<(), String> = Err("unexpected tag".to_string());
        match result.nbt_context("level.dat") {
            Err(LevelError::Nbt { context, message }) => {
                assert_eq!(context, "level.dat");
                assert_eq!(message, "unexpected tag");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
