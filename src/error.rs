//! Error taxonomy shared by the decode and encode pipelines.
//!
//! Mirrors the five-way split a reader/writer pair like this needs: a symbol
//! that simply isn't there, a symbol that is there but internally
//! inconsistent, one whose error correction couldn't recover the payload, an
//! encode-side invariant that doesn't hold for the requested content/version,
//! and a caller that handed us something incoherent.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No symbol could be located in the image, or a located symbol could
    /// not be sampled (binarization failure, finder/alignment search
    /// exhaustion, grid sampler stepping off the image).
    #[error("not found: {0}")]
    NotFound(String),

    /// A symbol was located but its encoded structure is inconsistent:
    /// unrecoverable format/version BCH, invalid mode indicator, malformed
    /// bitstream, an ECI value out of range, or an unsupported charset.
    #[error("format error: {0}")]
    Format(String),

    /// Reed-Solomon could not correct the codeword block, either because
    /// there were too many errors or because the algorithm degenerated
    /// (e.g. the error locator's constant term vanished).
    #[error("checksum error: {0}")]
    Checksum(String),

    /// An encode-side invariant failed: the content does not fit any
    /// version at the requested error correction level, or a character
    /// is not representable in the chosen mode.
    #[error("writer error: {0}")]
    Writer(String),

    /// The caller passed incoherent input: negative/zero sizes, a payload
    /// of the wrong shape for the requested mode, etc.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound(msg.into())
    }
    pub fn format<S: Into<String>>(msg: S) -> Error {
        Error::Format(msg.into())
    }
    pub fn checksum<S: Into<String>>(msg: S) -> Error {
        Error::Checksum(msg.into())
    }
    pub fn writer<S: Into<String>>(msg: S) -> Error {
        Error::Writer(msg.into())
    }
    pub fn illegal_argument<S: Into<String>>(msg: S) -> Error {
        Error::IllegalArgument(msg.into())
    }
}
