//! Viewer palettes and widget styling.
//!
//! Dark and light variants are picked from the system preference; numbers and
//! ids render in monospace, labels in the proportional font.

use std::sync::atomic::{AtomicU8, Ordering};

use eframe::egui::{
    self, Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Theme, Visuals,
};

const ROUNDING: Rounding = Rounding::same(3.0);

/// Accents used in both modes.
pub mod accent {
    use eframe::egui::Color32;

    pub const BLUE: Color32 = Color32::from_rgb(0x3b, 0x8e, 0xea);
    pub const GREEN: Color32 = Color32::from_rgb(0x22, 0xa8, 0x6b);
    pub const RED: Color32 = Color32::from_rgb(0xe5, 0x48, 0x4d);
}

/// Theme-aware colors.
#[derive(Clone, Copy)]
pub struct ThemeColors {
    pub bg_base: Color32,
    pub bg_panel: Color32,
    pub bg_header: Color32,
    pub bg_input: Color32,
    pub border: Color32,
    pub border_strong: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub hover: Color32,
}

const DARK: ThemeColors = ThemeColors {
    bg_base: Color32::from_rgb(0x16, 0x18, 0x1c),
    bg_panel: Color32::from_rgb(0x1c, 0x1f, 0x24),
    bg_header: Color32::from_rgb(0x22, 0x26, 0x2c),
    bg_input: Color32::from_rgb(0x28, 0x2c, 0x33),
    border: Color32::from_rgb(0x30, 0x35, 0x3d),
    border_strong: Color32::from_rgb(0x42, 0x48, 0x52),
    text_primary: Color32::from_rgb(0xdc, 0xe0, 0xe6),
    text_muted: Color32::from_rgb(0x8a, 0x91, 0x9c),
    hover: Color32::from_rgb(0x34, 0x39, 0x42),
};

const LIGHT: ThemeColors = ThemeColors {
    bg_base: Color32::from_rgb(0xf2, 0xf4, 0xf7),
    bg_panel: Color32::from_rgb(0xfc, 0xfd, 0xfe),
    bg_header: Color32::from_rgb(0xee, 0xf1, 0xf5),
    bg_input: Color32::from_rgb(0xe9, 0xec, 0xf1),
    border: Color32::from_rgb(0xd3, 0xd8, 0xdf),
    border_strong: Color32::from_rgb(0xbb, 0xc2, 0xcc),
    text_primary: Color32::from_rgb(0x1b, 0x1f, 0x26),
    text_muted: Color32::from_rgb(0x5f, 0x67, 0x73),
    hover: Color32::from_rgb(0xdb, 0xe0, 0xe8),
};

impl ThemeColors {
    /// Colors for the theme currently active in `ctx`.
    pub fn from_ctx(ctx: &egui::Context) -> Self {
        Self::for_theme(theme_of(ctx))
    }

    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => DARK,
            Theme::Light => LIGHT,
        }
    }
}

fn theme_of(ctx: &egui::Context) -> Theme {
    if ctx.style().visuals.dark_mode {
        Theme::Dark
    } else {
        Theme::Light
    }
}

/// Installs visuals, fonts and spacing for `theme`.
pub fn configure_style_for_theme(ctx: &egui::Context, theme: Theme) {
    ctx.set_visuals(build_visuals(theme));
    configure_fonts_and_spacing(ctx);
}

/// Styles the context for whichever mode it is in.
pub fn configure_style(ctx: &egui::Context) {
    configure_style_for_theme(ctx, theme_of(ctx));
}

fn build_visuals(theme: Theme) -> Visuals {
    let c = ThemeColors::for_theme(theme);
    let (mut visuals, selection_alpha) = match theme {
        Theme::Dark => (Visuals::dark(), 0.3),
        Theme::Light => (Visuals::light(), 0.2),
    };

    visuals.window_fill = c.bg_panel;
    visuals.panel_fill = c.bg_panel;
    visuals.faint_bg_color = c.bg_base;
    visuals.extreme_bg_color = c.bg_input;

    let w = &mut visuals.widgets;
    for (style, fill, fg, stroke) in [
        (&mut w.noninteractive, c.bg_input, c.text_muted, c.border),
        (&mut w.inactive, c.bg_input, c.text_primary, c.border_strong),
        (&mut w.hovered, c.hover, c.text_primary, accent::BLUE),
        (&mut w.active, accent::BLUE, Color32::WHITE, accent::BLUE),
        (&mut w.open, c.bg_input, c.text_primary, c.border_strong),
    ] {
        style.bg_fill = fill;
        style.fg_stroke = Stroke::new(1.0, fg);
        style.bg_stroke = Stroke::new(1.0, stroke);
        style.rounding = ROUNDING;
    }

    visuals.selection.bg_fill = accent::BLUE.gamma_multiply(selection_alpha);
    visuals.selection.stroke = Stroke::new(1.0, accent::BLUE);
    visuals
}

fn configure_fonts_and_spacing(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    let prop = |size| FontId::new(size, FontFamily::Proportional);
    style.text_styles = [
        (TextStyle::Small, prop(10.5)),
        (TextStyle::Body, prop(13.0)),
        (TextStyle::Button, prop(13.0)),
        (TextStyle::Heading, prop(16.0)),
        (TextStyle::Monospace, FontId::new(12.5, FontFamily::Monospace)),
    ]
    .into();

    style.spacing.item_spacing = egui::vec2(8.0, 5.0);
    style.spacing.button_padding = egui::vec2(12.0, 5.0);
    style.spacing.combo_height = 320.0;
    style.spacing.slider_width = 180.0;

    ctx.set_style(style);
}

/// Filled button for the main action of a group.
pub fn primary_button(text: &str) -> egui::Button<'_> {
    let label = egui::RichText::new(text).color(Color32::WHITE).strong();
    egui::Button::new(label)
        .fill(accent::GREEN)
        .rounding(ROUNDING)
}

/// Small caps label above an input.
pub fn form_label(text: &str) -> egui::RichText {
    egui::RichText::new(text.to_uppercase()).size(10.5).strong()
}

/// Name column of the summary grid.
pub fn stat_label(text: &str) -> egui::RichText {
    egui::RichText::new(text).size(11.5).weak()
}

/// Value column of the summary grid.
pub fn stat_value(text: &str) -> egui::RichText {
    egui::RichText::new(text).size(11.5).monospace()
}

/// Last styled mode: 0 unset, 1 dark, 2 light.
static STYLED_MODE: AtomicU8 = AtomicU8::new(0);

/// Re-apply styling when the system switches between dark and light mode.
/// Call once per frame.
pub fn apply_system_theme(ctx: &egui::Context) {
    let theme = theme_of(ctx);
    let mode = match theme {
        Theme::Dark => 1,
        Theme::Light => 2,
    };
    if STYLED_MODE.swap(mode, Ordering::Relaxed) != mode {
        configure_style_for_theme(ctx, theme);
    }
}
