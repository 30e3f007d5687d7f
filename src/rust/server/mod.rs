//! TCP classification daemon.
//!
//! Each accepted connection carries exactly one exchange: the client sends a
//! JSON object with the four impact features, the daemon answers with the
//! class label as ASCII decimal followed by `\n` and closes. Requests that
//! fail to parse or validate are closed without a response.

mod daemon;
mod protocol;

pub use daemon::{handle_connection, Server, ServerError};
pub use protocol::{decode_response, encode_response, ClassifyRequest, RequestError};
