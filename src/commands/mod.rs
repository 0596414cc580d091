//! Commands Layer
//!
//! Entry points the UI calls. Every command returns `Result<T, String>` so a
//! failure can be shown as-is.

mod term_cmd;
mod ranking_cmd;

pub use term_cmd::*;
pub use ranking_cmd::*;
