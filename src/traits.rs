//! Custom traits and trait implementations for `egui` and `std` types.
//!
//! `MyStyle` sets the application look once at startup, `Notification` lets
//! `layout.rs` show modal windows polymorphically, and `PathExtension` helps
//! `file_dialog.rs` with file names.

use egui::{
    Align, Color32, Context,
    FontFamily::Proportional,
    FontId, Frame, Layout, Spacing, Stroke, Style,
    TextStyle::{Body, Button, Heading, Monospace, Small},
    Vec2, Visuals, Window,
    style::ScrollStyle,
};

use std::{ffi::OsStr, path::Path};

/// Custom text styles for the egui context.
/// Used by `MyStyle::set_style_init`.
pub const CUSTOM_TEXT_STYLE: [(egui::TextStyle, egui::FontId); 5] = [
    (Heading, FontId::new(18.0, Proportional)),
    (Body, FontId::new(16.0, Proportional)),
    (Button, FontId::new(16.0, Proportional)),
    (Monospace, FontId::new(15.0, egui::FontFamily::Monospace)), // SQL editor
    (Small, FontId::new(14.0, Proportional)),
];

/// Applies the application style to the `egui` context.
pub trait MyStyle {
    fn set_style_init(&self, visuals: Visuals);
}

impl MyStyle for Context {
    /// Configures theme, spacing and text styles.
    ///
    /// ### Logic
    /// 1. Define custom scrollbar settings (`ScrollStyle`).
    /// 2. Define custom widget spacing (`Spacing`).
    /// 3. Build a `Style` from `visuals`, the spacing and `CUSTOM_TEXT_STYLE`.
    /// 4. Apply it to the context.
    fn set_style_init(&self, visuals: Visuals) {
        let scroll = ScrollStyle {
            handle_min_length: 32.0,
            ..ScrollStyle::default()
        };

        let spacing = Spacing {
            scroll,
            item_spacing: [8.0, 6.0].into(),
            ..Spacing::default()
        };

        let style = Style {
            visuals,
            spacing,
            text_styles: CUSTOM_TEXT_STYLE.into(),
            ..Style::default()
        };

        self.set_style(style);
    }
}

/// Modal notification windows managed by `layout.rs` via `Box<dyn Notification>`.
pub trait Notification: Send + Sync + 'static {
    /// Renders the window.
    ///
    /// ### Returns
    /// `true` while the window should stay open.
    fn show(&mut self, ctx: &Context) -> bool;
}

/// Error window. Messages reaching it are already stripped of warehouse detail.
pub struct Error {
    pub message: String,
}

impl Notification for Error {
    fn show(&mut self, ctx: &Context) -> bool {
        let mut open = true;

        Window::new("Error")
            .collapsible(false)
            .open(&mut open)
            .show(ctx, |ui| {
                let width_max = ui.available_width() * 0.80;
                ui.allocate_ui_with_layout(
                    Vec2::new(width_max, ui.available_height()),
                    Layout::top_down(Align::LEFT),
                    |ui| {
                        Frame::default()
                            .fill(Color32::from_rgb(255, 200, 200)) // Light red bg
                            .stroke(Stroke::new(1.0, Color32::DARK_RED))
                            .outer_margin(2.0)
                            .inner_margin(10.0)
                            .show(ui, |ui| {
                                ui.colored_label(Color32::BLACK, &self.message);
                            });
                    },
                );
            });

        open
    }
}

/// Lowercase file extension of a path.
/// Used by `file_dialog.rs`.
pub trait PathExtension {
    fn extension_as_lowercase(&self) -> Option<String>;

    /// `true` for `*.json` regardless of case.
    fn is_json(&self) -> bool {
        self.extension_as_lowercase().as_deref() == Some("json")
    }
}

impl PathExtension for Path {
    fn extension_as_lowercase(&self) -> Option<String> {
        self.extension().and_then(OsStr::to_str).map(str::to_lowercase)
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

/// Run tests with:
/// `cargo test -- --show-output tests_path_extension`
#[cfg(test)]
mod tests_path_extension {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extension_as_lowercase_some() {
        let path = PathBuf::from("service-account.JSON");
        assert_eq!(path.extension_as_lowercase(), Some("json".to_string()));
        assert!(path.is_json());
    }

    #[test]
    fn test_extension_as_lowercase_none() {
        let path = PathBuf::from("keyfile");
        assert_eq!(path.extension_as_lowercase(), None);
        assert!(!path.is_json());
    }

    #[test]
    fn test_extension_multiple_dots() {
        let path = PathBuf::from("chart.vl.json");
        assert!(path.is_json());
        assert!(!PathBuf::from("chart.json.bak").is_json());
    }
}
