use crate::models::SchoolRecord;
use thiserror::Error;

/// Failure to obtain a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not start browser session: {0}")]
    BrowserStart(String),

    #[error("render of {url} failed: {message}")]
    Render { url: String, message: String },

    #[error("browser rendering is disabled")]
    RenderDisabled,
}

impl FetchError {
    pub fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else if let Some(status) = e.status() {
            FetchError::Status { url: url.to_string(), status: status.as_u16() }
        } else {
            FetchError::Network { url: url.to_string(), source: e }
        }
    }
}

/// Markup did not have the shape a parser required.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("unexpected page structure: {0}")]
    Structure(String),
}

/// Error raised by one field procedure. Always caught by the aggregator.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// The only error that escapes a school's aggregate run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Session teardown failed after every field was attempted. The record
    /// is kept so field-level errors are not lost.
    #[error("session teardown failed for {}: {source}", record.name)]
    Teardown {
        #[source]
        source: FetchError,
        record: Box<SchoolRecord>,
    },
}

impl ScrapeError {
    pub fn into_record(self) -> SchoolRecord {
        match self {
            ScrapeError::Teardown { record, .. } => *record,
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_error_keeps_record() {
        let err = ScrapeError::Teardown {
            source: FetchError::BrowserStart("gone".into()),
            record: Box::new(SchoolRecord::failed("ISM", "boom")),
        };
        assert!(err.to_string().contains("ISM"));
        let rec = err.into_record();
        assert_eq!(rec.error_count(), 5);
    }

    #[test]
    fn parse_error_converts_into_extract_error() {
        let e: ExtractError = ParseError::Selector("div[".into()).into();
        assert!(matches!(e, ExtractError::Parse(_)));
        assert_eq!(e.to_string(), "invalid selector `div[`");
    }
}
