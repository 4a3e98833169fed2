//! Error taxonomy for the pipeline stages.
//!
//! - [`FetchError`]: reaching the origin site or the model API failed.
//! - [`StructureError`]: a model reply could not be turned into a record.
//!   Always recovered by the fallback record, never propagated past a document.
//! - [`PersistenceError`]: the store rejected a read or write. Fatal to the run.
//! - [`ConfigError`]: the YAML configuration file is unreadable or invalid.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unexpected response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("not configured: set {0}")]
    NotConfigured(&'static str),
}

#[derive(Error, Debug)]
pub enum StructureError {
    #[error("model call failed: {0}")]
    Model(#[from] FetchError),

    #[error("empty model reply")]
    Empty,

    #[error("no JSON object found in model reply")]
    NoObject,

    #[error("model reply looks truncated: {0}")]
    Truncated(#[source] serde_json::Error),

    #[error("embedded JSON object is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model reply is JSON but not an object")]
    NotObject,

    #[error("merged record does not match the schema: {0}")]
    Schema(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("store credentials missing: set {0}")]
    MissingCredentials(&'static str),

    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode store rows: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
