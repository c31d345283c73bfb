//! Shared helpers used by config validation and report packaging

pub mod format;
pub mod slug;

pub use format::format_braces;
pub use slug::slugify;
