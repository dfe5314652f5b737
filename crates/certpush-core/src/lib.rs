#![forbid(unsafe_code)]

pub mod client;
pub mod identity;
pub mod message;
pub mod payload;
pub mod response;

pub use error::Error;

pub(crate) mod error;
