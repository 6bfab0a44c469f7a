//! Probe error taxonomy
//!
//! Every way a single test case can fail before its answer is validated.
//! Heuristic mismatches are not errors; they are a validated outcome.

use thiserror::Error;

use crate::http::HttpError;
use crate::models::Outcome;
use crate::response::ExtractionError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Connection refused, DNS failure, timeout
    #[error("{0}")]
    Transport(#[from] HttpError),

    /// Gateway answered with a status other than 200
    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the JSON the transport expects
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    #[error("could not extract answer: {0}")]
    Extraction(#[from] ExtractionError),
}

impl ProbeError {
    /// Taxonomy class used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Transport(_) => "TransportError",
            ProbeError::Status { .. } | ProbeError::MalformedBody(_) => "ProtocolError",
            ProbeError::Extraction(_) => "ExtractionError",
        }
    }

    /// Terminal outcome this error leaves the case in
    pub fn outcome(&self) -> Outcome {
        match self {
            ProbeError::Transport(_) | ProbeError::Status { .. } => Outcome::FailedTransport,
            ProbeError::MalformedBody(_) | ProbeError::Extraction(_) => Outcome::FailedParse,
        }
    }
}
