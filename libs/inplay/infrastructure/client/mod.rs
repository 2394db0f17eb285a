//! HTTP clients for the upstream feed and the bookmakers

pub mod bookmaker;
pub mod feed;
pub mod helpers;

use thiserror::Error;

pub use bookmaker::{
    BookmakerError, BookmakerTransport, HttpTransportFactory, SessionAuth, TransportFactory,
};
pub use feed::{FeedBatch, FeedError, FeedSource, HttpFeedClient};

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("{context} ({status}): {body}")]
    Api {
        status: u16,
        context: String,
        body: String,
    },

    #[error("Deserialization failed: {0}")]
    DeserializeFailed(String),
}
