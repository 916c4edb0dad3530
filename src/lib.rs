//! Inbox Check — end-to-end verification of email ingestion by a document API.

pub mod api;
pub mod config;
pub mod correlation;
pub mod documents;
pub mod error;
pub mod pipeline;
pub mod poller;
pub mod submit;
