//! Pipeline Notes - journaling server with file-based note sync
//!
//! Core library for the HTTP transport and the notes sync API.

pub mod config;
pub mod http;
pub mod notes;
pub mod server;
pub mod static_files;
