//! Pure decoders for opaque cookie tokens and IPv4 addresses.

pub mod identity;
pub mod ip;

pub use identity::{decode_embedded_timestamp, decode_session_uid, NO_TIMESTAMP};
pub use ip::{format_ip, parse_ip};
