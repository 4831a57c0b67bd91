//! HTTP/1.1 subset spoken by the notes server.
//!
//! # Architecture
//!
//! - **`connection`**: One client socket, its keep-alive flag and idle deadline
//! - **`parser`**: Decodes one request from a connection, with bounded retries
//! - **`request`**: Request representation and a case-insensitive header map
//! - **`response`**: Response representation, builder, and the `Reply` variant
//! - **`writer`**: Renders a `Reply` into wire bytes and writes them in one go
//! - **`mime`**: Mimetype table keyed by file extension
//! - **`retry`**: Bounded-retry reads shared by the decoder
//!
//! # Request cycle
//!
//! ```text
//!        ┌─────────────┐
//!        │   Readable  │ ← poll loop saw the first chunk
//!        └──────┬──────┘
//!               │ decode
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← notes API or static asset
//!        └──────┬───────────┘
//!               │ Reply ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← one write of the rendered bytes
//!        └──────┬───────────┘
//!               │
//!               ├─ Keep-Alive → back into the registry
//!               └─ Close → dropped
//! ```

pub mod request;
pub mod response;
pub mod parser;
pub mod connection;
pub mod writer;
pub mod mime;
pub mod retry;
