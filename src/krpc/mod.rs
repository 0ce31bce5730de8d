pub mod codec;
pub mod connection;
pub mod schema;

pub use codec::{Decode, Encode};
pub use connection::Connection;

use thiserror::Error;

use schema::ConnectionStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on the kRPC socket")]
    Io(#[from] std::io::Error),

    #[error("Malformed protobuf message")]
    Decode(#[from] prost::DecodeError),

    #[error("Server refused the connection ({status:?}): {message}")]
    ConnectionRefused {
        status: ConnectionStatus,
        message: String,
    },

    #[error("Server answered the handshake with unknown status {0}")]
    UnknownStatus(i32),

    #[error("{service}.{name}: {description}")]
    Rpc {
        service: String,
        name: String,
        description: String,
    },

    #[error("Response to '{0}' carried no result")]
    MissingResult(String),

    #[error("Server returned a null {0}")]
    NullObject(&'static str),

    #[error("Value truncated: needed {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("String value is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Frame of {0} bytes exceeds the maximum message size")]
    FrameTooLarge(u64),

    #[error("Length prefix is not a valid varint")]
    VarintOverflow,

    #[error("Connection lock poisoned by a panicking caller")]
    Poisoned,
}

impl From<schema::Error> for Error {
    fn from(e: schema::Error) -> Self {
        Error::Rpc {
            service: e.service,
            name: e.name,
            description: e.description,
        }
    }
}
