// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating shape records or decoding structured data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid shape parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("Malformed structured data at byte {offset}: {message}")]
    Llsd { offset: usize, message: String },

    #[error("Unexpected value type: expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
}

impl Error {
    pub(crate) fn parameter(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}
