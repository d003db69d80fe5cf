//! UI state for panel visibility and view options.

use crate::viewer::Colormap;

/// UI panel visibility and toggle state.
pub struct UiState {
    /// Whether the gate plot window is visible.
    pub show_plot: bool,
    /// Whether to use log scale for the histogram y axis.
    pub log_histogram: bool,
    /// Whether to draw the cell mask outline.
    pub show_mask: bool,
    /// Histogram bin count.
    pub n_bins: usize,
    /// Colormap of the gated marker channel.
    pub marker_colormap: Colormap,
    /// Colormap of the reference channel.
    pub reference_colormap: Colormap,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            show_plot: true,
            log_histogram: false,
            show_mask: true,
            n_bins: 100,
            marker_colormap: Colormap::Green,
            reference_colormap: Colormap::Magenta,
        }
    }
}

/// Severity of the status line message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Info,
    /// Declined action; shown without alarm.
    Notice,
    Error,
}

/// Last message for the user.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusLine {
    pub fn set(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.kind = kind;
        self.text = text.into();
    }
}
