use std::fmt;

#[derive(Debug)]
pub enum ReportError {
    MissingPageTemplate,
    UnplaceableFlowable(String),
    InvalidConfiguration(String),
    Decode(serde_json::Error),
    InvalidOutput(String),
    Io(std::io::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::MissingPageTemplate => write!(f, "no page template available"),
            ReportError::UnplaceableFlowable(message) => {
                write!(f, "flowable cannot fit on any page: {}", message)
            }
            ReportError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            ReportError::Decode(err) => write!(f, "metadata decode error: {}", err),
            ReportError::InvalidOutput(message) => write!(f, "invalid output: {}", message),
            ReportError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Decode(err) => Some(err),
            ReportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ReportError {
    fn from(value: std::io::Error) -> Self {
        ReportError::Io(value)
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(value: serde_json::Error) -> Self {
        ReportError::Decode(value)
    }
}
