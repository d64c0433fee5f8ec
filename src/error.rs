//! # Error Types
//!
//! This module defines the single error type returned by every stage of the compiler.
//!
//! Compilation stops at the first error. Every error that leaves the public API carries
//! the [`SourceRegion`] it refers to, so that the user can be shown the offending line
//! with a caret under the problem.
//!
//! ## Error Kinds
//! - `Grammar` - a token or command line that does not parse
//! - `Range` - a pitch outside 0..=127, or a setting outside its bounds
//! - `Timing` - bar length mismatch, incompatible durations or groove lengths
//! - `State` - configuration after the song has started playing, unknown tracks or keys
//! - `Continuation` - illegal ties
//!
//! ## Locations
//! Errors raised deep inside resolution (for example by the pitch arithmetic) are created
//! without a location. The caller that knows which item is being resolved fills it in
//! with [`SongError::or_at`] before returning.
//!
//! ## Usage
//! ```rust
//! use melody_script::{compile, SourceFile};
//!
//! let file = SourceFile::from_string("tune.song", "c d e f | g2 g2 | c");
//! match compile(&file) {
//!     Ok(song) => println!("{} ticks", song.tick()),
//!     Err(e) => eprintln!("{}", e.diagnostic()),
//! }
//! ```

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::region::SourceRegion;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SongError {
    /// A token, item or command that does not match the notation grammar.
    ///
    /// # Example
    /// ```
    /// # use melody_script::SongError;
    /// let err = SongError::grammar("Invalid bar line: 'wrong'");
    /// assert_eq!(err.to_string(), "Invalid bar line: 'wrong'");
    /// ```
    #[error("{message}")]
    Grammar {
        message: String,
        location: Option<SourceRegion>,
    },

    /// A value outside its allowed range (MIDI note numbers, setting bounds).
    #[error("{message}")]
    Range {
        message: String,
        location: Option<SourceRegion>,
    },

    /// Bar lengths, durations and grooves that do not fit the song's timing.
    #[error("{message}")]
    Timing {
        message: String,
        location: Option<SourceRegion>,
    },

    /// An operation that is not allowed in the song's current state.
    #[error("{message}")]
    State {
        message: String,
        location: Option<SourceRegion>,
    },

    /// Ties and continued notes that do not link up.
    #[error("{message}")]
    Continuation {
        message: String,
        location: Option<SourceRegion>,
    },
}

impl SongError {
    pub fn grammar(message: impl Into<String>) -> Self {
        SongError::Grammar {
            message: message.into(),
            location: None,
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        SongError::Range {
            message: message.into(),
            location: None,
        }
    }

    pub fn timing(message: impl Into<String>) -> Self {
        SongError::Timing {
            message: message.into(),
            location: None,
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        SongError::State {
            message: message.into(),
            location: None,
        }
    }

    pub fn continuation(message: impl Into<String>) -> Self {
        SongError::Continuation {
            message: message.into(),
            location: None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SongError::Grammar { message, .. }
            | SongError::Range { message, .. }
            | SongError::Timing { message, .. }
            | SongError::State { message, .. }
            | SongError::Continuation { message, .. } => message,
        }
    }

    pub fn location(&self) -> Option<&SourceRegion> {
        match self {
            SongError::Grammar { location, .. }
            | SongError::Range { location, .. }
            | SongError::Timing { location, .. }
            | SongError::State { location, .. }
            | SongError::Continuation { location, .. } => location.as_ref(),
        }
    }

    fn location_mut(&mut self) -> &mut Option<SourceRegion> {
        match self {
            SongError::Grammar { location, .. }
            | SongError::Range { location, .. }
            | SongError::Timing { location, .. }
            | SongError::State { location, .. }
            | SongError::Continuation { location, .. } => location,
        }
    }

    /// Set the location, replacing any existing one
    pub fn at(mut self, region: &SourceRegion) -> Self {
        *self.location_mut() = Some(region.clone());
        self
    }

    /// Set the location only if the error does not have one yet
    pub fn or_at(mut self, region: &SourceRegion) -> Self {
        let location = self.location_mut();
        if location.is_none() {
            *location = Some(region.clone());
        }
        self
    }

    /// Format the error the way it is shown to the user
    pub fn diagnostic(&self) -> Diagnostic<'_> {
        Diagnostic { error: self }
    }
}

/// Display adapter producing the user-facing error report:
///
/// ```text
/// tune.song:3:Completed bar is 3 ticks long, but expected 4 ticks
///
/// c d e | f g a b |
///                 ^
///                 Completed bar is 3 ticks long, but expected 4 ticks
/// ```
pub struct Diagnostic<'a> {
    error: &'a SongError,
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.error.message();
        match self.error.location() {
            Some(region) => {
                let line = region.line();
                let indent = " ".repeat(region.column());
                writeln!(f, "{}:{}:{}", line.file_name(), line.line_number(), message)?;
                writeln!(f)?;
                writeln!(f, "{}", line.text())?;
                writeln!(f, "{}^", indent)?;
                write!(f, "{}{}", indent, message)
            }
            None => write!(f, "{}", message),
        }
    }
}

/// Failure of [`crate::compile_file`]: either the file could not be read, or it did not
/// compile.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Error reading file '{}': {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Song(#[from] SongError),
}

impl CompileError {
    /// The user-facing report; I/O failures have no source line to point at
    pub fn report(&self) -> String {
        match self {
            CompileError::Io { .. } => self.to_string(),
            CompileError::Song(e) => e.diagnostic().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::SourceLine;

    #[test]
    fn test_or_at_keeps_existing_location() {
        let line = SourceLine::new("song", 2, "c d e");
        let first = SourceRegion::whole_line(line.clone()).slice(2, 3);
        let second = SourceRegion::whole_line(line).slice(4, 5);

        let err = SongError::range("Note number 128 > 127").or_at(&first).or_at(&second);
        assert_eq!(err.location(), Some(&first));

        let err = err.at(&second);
        assert_eq!(err.location(), Some(&second));
    }

    #[test]
    fn test_diagnostic_format() {
        let line = SourceLine::new("tune.song", 3, "c d e | f");
        let region = SourceRegion::whole_line(line).slice(6, 7);
        let err = SongError::timing("Completed bar is 3 ticks long, but expected 4 ticks").at(&region);
        let expected = "tune.song:3:Completed bar is 3 ticks long, but expected 4 ticks\n\
                        \n\
                        c d e | f\n      \
                        ^\n      \
                        Completed bar is 3 ticks long, but expected 4 ticks";
        assert_eq!(err.diagnostic().to_string(), expected);
    }

    #[test]
    fn test_compile_error_report() {
        let err = CompileError::Io {
            path: PathBuf::from("missing.song"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.report(), "Error reading file 'missing.song': not found");

        let err = CompileError::from(SongError::grammar("Invalid bar line: 'wrong'"));
        assert_eq!(err.report(), "Invalid bar line: 'wrong'");
    }

    #[test]
    fn test_diagnostic_without_location() {
        let err = SongError::state("Cannot perform operation once song is playing");
        assert_eq!(err.diagnostic().to_string(), "Cannot perform operation once song is playing");
    }
}
