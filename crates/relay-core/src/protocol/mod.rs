//! Protocol module containing the relayed message types and their JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_message, encode_message, DecodeError};
pub use messages::{Message, User};
