pub(crate) mod error;
pub(crate) mod forward;
pub(crate) mod health;

pub(crate) use error::RelayError;
