//! UI rendering modules.
//!
//! Contains the UI rendering logic split into separate modules:
//! - `control_panel`: Left sidebar with selection and gate controls
//! - `main_view`: Central panel with the image layers
//! - `plot_window`: Scatter plot and histogram with gate lines

mod control_panel;
mod main_view;
mod plot_window;
pub mod theme;
