//! Domain types for the IPO study.

pub mod flags;
pub mod record;
pub mod window;

pub use flags::{Day0Level, Flag, Membership};
pub use record::{AnnotatedIpo, IpoRecord, WindowReturns};
pub use window::ReturnWindow;
