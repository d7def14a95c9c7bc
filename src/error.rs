use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} returned HTTP {status}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },
    #[error("unexpected data from {url}: {reason}")]
    DataShape { url: String, reason: String },
    #[error("station {station} has no {field}")]
    MissingStationField {
        station: String,
        field: &'static str,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to write xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    pub(crate) fn data_shape(url: &str, reason: impl Into<String>) -> Self {
        Self::DataShape {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
