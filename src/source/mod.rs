//! Document sources and format kinds

pub mod kind;
pub mod stream;

pub use kind::{file_kind, FormatKind};
pub use stream::Stream;
