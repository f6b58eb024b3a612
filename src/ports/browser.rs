//! Browser-side ports: navigation and the address-bar query string.
//!
//! Synchronous; both are local to the current tab.

/// Client-side navigation.
pub trait NavigatorPort: Send + Sync {
    /// Navigate to `path`, replacing the current history entry.
    fn redirect(&self, path: &str);

    /// Path of the current route, without query string.
    fn current_path(&self) -> String;
}

/// Query parameters of the current route.
pub trait AddressBarPort: Send + Sync {
    fn query_param(&self, key: &str) -> Option<String>;

    /// Set (`Some`) or remove (`None`) a parameter. Replaces the history entry.
    fn replace_query_param(&self, key: &str, value: Option<&str>);
}
