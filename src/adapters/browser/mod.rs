//! Browser adapter: location, query string and replace-only navigation.

pub mod location;

pub use location::BrowserLocation;
