pub mod tui;

/// Applies the console theme for all subsequent inquire prompts.
/// Call once at startup (e.g. in main after tracing init).
pub fn init_ui() {
    tui::apply_theme();
}
