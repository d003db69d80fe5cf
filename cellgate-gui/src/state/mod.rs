//! Application state modules.

mod ui;

pub use ui::{StatusKind, StatusLine, UiState};
