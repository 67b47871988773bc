mod custom_field;
mod enumerations;
mod filters;
mod issue;
mod project;
mod reference;
mod time_entry;
mod user;

pub use custom_field::*;
pub use enumerations::*;
pub use filters::*;
pub use issue::*;
pub use project::*;
pub use reference::*;
pub use time_entry::*;
pub use user::*;
