//! Custom error-type definitions
use thiserror::Error;
use url::ParseError;

/// primary error-type for the strikefuzz crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StrikeFuzzError {
    /// Represents a failure to open a word-list file during cursor creation.
    #[error("The word-list `{path}` couldn't be opened.")]
    WordlistOpenError {
        /// underlying source error-type
        source: std::io::Error,

        /// path to the file that couldn't be opened
        path: String,
    },

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError {
        /// underlying source error-type
        #[from]
        source: std::io::Error,
    },

    /// Represents a failure to parse the given string into a [`url::Url`]
    #[error("The url `{url}` is invalid and couldn't be parsed.")]
    InvalidUrl {
        /// underlying source error-type
        source: ParseError,

        /// the url that couldn't be parsed
        url: String,
    },

    /// Represents a missing target url; the engine cannot make progress without one
    #[error("No target url was provided")]
    MissingUrl,

    /// Represents a filter/match rule that couldn't be parsed into an inclusive range
    #[error("Could not parse `{rule}` as a filter/match rule: {reason}")]
    InvalidFilterRule {
        /// the rule text that couldn't be parsed
        rule: String,

        /// underlying reason for the parsing error
        reason: &'static str,
    },

    /// Represents an invalid parameter passed to some function or constructor
    #[error("Invalid parameter provided, {message}: {param}")]
    InvalidParameter {
        /// the failing parameter
        param: String,

        /// the associated message to help the user
        message: &'static str,
    },

    /// Represents a failure to construct the underlying [`reqwest::Client`]
    ///
    /// this is fatal; without a transport multiplexer the engine cannot send
    /// anything at all
    #[error("Could not build the http transport: {source}")]
    TransportBuildError {
        /// underlying source error-type
        source: reqwest::Error,
    },

    /// Represents a failure encountered during sending a request / receiving a response
    #[error("An error occurred while sending the request: {source}")]
    RequestError {
        /// underlying source error-type
        #[from]
        source: reqwest::Error,
    },
}
