mod client;
mod redmine_url;
pub mod domain;

pub(crate) use redmine_url::*;

pub use client::*;
pub use domain::*;
