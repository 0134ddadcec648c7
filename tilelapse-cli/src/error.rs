//! CLI error type.

use std::fmt;

use tilelapse::crawler::CrawlError;
use tilelapse::fetch::HttpError;
use tilelapse::geo::GeoError;
use tilelapse::output::OutputError;

/// Errors surfaced to the user by the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or inconsistent command-line options.
    Options(String),
    Geo(GeoError),
    Http(HttpError),
    Crawl(CrawlError),
    Output(OutputError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Options(message) => write!(f, "{}", message),
            CliError::Geo(e) => write!(f, "{}", e),
            CliError::Http(e) => write!(f, "{}", e),
            CliError::Crawl(e) => write!(f, "{}", e),
            CliError::Output(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<GeoError> for CliError {
    fn from(e: GeoError) -> Self {
        CliError::Geo(e)
    }
}

impl From<HttpError> for CliError {
    fn from(e: HttpError) -> Self {
        CliError::Http(e)
    }
}

impl From<CrawlError> for CliError {
    fn from(e: CrawlError) -> Self {
        CliError::Crawl(e)
    }
}

impl From<OutputError> for CliError {
    fn from(e: OutputError) -> Self {
        CliError::Output(e)
    }
}
