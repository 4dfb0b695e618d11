// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::error::Error;
use std::fmt::Display;
use std::fmt::Formatter;

/// What went wrong, coarsely. Callers branch on this; the message is for
/// humans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced card (or material) has no schedule in scope.
    NotFound,
    /// A rating outside Again/Hard/Good/Easy.
    InvalidRating,
    /// The schedule changed between load and write, and retries ran out.
    Conflict,
    /// The storage collaborator failed.
    StorageUnavailable,
    /// Anything else: bad input, bad config, malformed data.
    Invalid,
}

impl ErrorKind {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Conflict)
    }
}

#[derive(Debug, PartialEq)]
pub struct ErrorReport {
    kind: ErrorKind,
    message: String,
}

impl ErrorReport {
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Invalid, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        ErrorReport {
            kind,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::NotFound, msg)
    }

    pub fn invalid_rating(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::InvalidRating, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Conflict, msg)
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::StorageUnavailable, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<std::io::Error> for ErrorReport {
    fn from(value: std::io::Error) -> Self {
        ErrorReport::new(format!("I/O error: {value:#?}"))
    }
}

impl From<serde_json::Error> for ErrorReport {
    fn from(value: serde_json::Error) -> Self {
        ErrorReport::new(format!("JSON error: {value:#?}"))
    }
}

impl From<toml::de::Error> for ErrorReport {
    fn from(value: toml::de::Error) -> Self {
        ErrorReport::new(format!("config error: {value}"))
    }
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

impl Error for ErrorReport {}

pub type Fallible<T> = Result<T, ErrorReport>;

pub fn fail<T>(msg: impl Into<String>) -> Fallible<T> {
    Err(ErrorReport::new(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ErrorReport::not_found("card 7 not found.");
        assert_eq!(err.to_string(), "error: card 7 not found.");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_only_conflicts_are_transient() {
        assert!(ErrorKind::Conflict.is_transient());
        assert!(!ErrorKind::NotFound.is_transient());
        assert!(!ErrorKind::InvalidRating.is_transient());
        assert!(!ErrorKind::StorageUnavailable.is_transient());
        assert!(!ErrorKind::Invalid.is_transient());
    }

    #[test]
    fn test_fail_is_invalid() {
        let result: Fallible<()> = fail("nope");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Invalid);
    }
}
