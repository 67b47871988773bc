mod activity;
mod clock;
mod error;
mod queue;
mod review;
mod session;
mod settings;
mod store;
mod submit;
mod task;
mod timer;

pub use activity::*;
pub use clock::*;
pub use error::*;
pub use queue::*;
pub use review::*;
pub use session::*;
pub use settings::*;
pub use store::*;
pub use submit::*;
pub use task::*;
pub use timer::*;
