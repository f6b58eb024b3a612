//! In-process model of the tab's location. Implements NavigatorPort and AddressBarPort.
//!
//! Every change replaces the current history entry; `history_len` only grows via `push`.

use crate::ports::{AddressBarPort, NavigatorPort};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct LocationState {
    path: String,
    query: Vec<(String, String)>,
    history_len: usize,
    redirects: Vec<String>,
}

impl LocationState {
    fn href(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let qs: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.path, qs.join("&"))
    }
}

/// Current tab location: path, query string and a replace-only history.
#[derive(Debug)]
pub struct BrowserLocation {
    state: Mutex<LocationState>,
}

impl BrowserLocation {
    /// Start at `href` (e.g. `/admin/projects?q=bar`). Undecodable pairs are dropped.
    pub fn new(href: &str) -> Self {
        let (path, query) = split_href(href);
        Self {
            state: Mutex::new(LocationState {
                path,
                query,
                history_len: 1,
                redirects: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LocationState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Path plus encoded query string.
    pub fn href(&self) -> String {
        self.lock().href()
    }

    /// Regular navigation (adds a history entry), e.g. following a sidebar link.
    pub fn push(&self, href: &str) {
        let (path, query) = split_href(href);
        let mut s = self.lock();
        s.path = path;
        s.query = query;
        s.history_len += 1;
    }

    pub fn history_len(&self) -> usize {
        self.lock().history_len
    }

    /// Every path passed to `redirect`, in order.
    pub fn redirects(&self) -> Vec<String> {
        self.lock().redirects.clone()
    }
}

impl NavigatorPort for BrowserLocation {
    fn redirect(&self, path: &str) {
        let (new_path, query) = split_href(path);
        let mut s = self.lock();
        debug!(from = %s.path, to = %new_path, "replace navigation");
        s.path = new_path;
        s.query = query;
        s.redirects.push(path.to_string());
    }

    fn current_path(&self) -> String {
        self.lock().path.clone()
    }
}

impl AddressBarPort for BrowserLocation {
    fn query_param(&self, key: &str) -> Option<String> {
        self.lock()
            .query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn replace_query_param(&self, key: &str, value: Option<&str>) {
        let mut s = self.lock();
        match value {
            Some(v) => {
                if let Some(slot) = s.query.iter_mut().find(|(k, _)| k == key) {
                    slot.1 = v.to_string();
                } else {
                    s.query.push((key.to_string(), v.to_string()));
                }
            }
            None => s.query.retain(|(k, _)| k != key),
        }
    }
}

fn split_href(href: &str) -> (String, Vec<(String, String)>) {
    let (path, qs) = href.split_once('?').unwrap_or((href, ""));
    (path.to_string(), parse_query(qs))
}

fn parse_query(qs: &str) -> Vec<(String, String)> {
    qs.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let k = urlencoding::decode(&k.replace('+', " ")).ok()?.into_owned();
            let v = urlencoding::decode(&v.replace('+', " ")).ok()?.into_owned();
            Some((k, v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_rewrites_query_without_new_history_entries() {
        let loc = BrowserLocation::new("/admin/projects?page=2&q=hello%20world");
        assert_eq!(loc.query_param("q").as_deref(), Some("hello world"));

        loc.replace_query_param("q", Some("a&b"));
        assert_eq!(loc.href(), "/admin/projects?page=2&q=a%26b");

        loc.replace_query_param("q", None);
        assert_eq!(loc.href(), "/admin/projects?page=2");
        assert_eq!(loc.query_param("q"), None);
        assert_eq!(loc.history_len(), 1);
    }

    #[test]
    fn redirect_replaces_entry_and_is_recorded() {
        let loc = BrowserLocation::new("/admin");
        loc.redirect("/admin/login");
        assert_eq!(loc.current_path(), "/admin/login");
        assert_eq!(loc.redirects(), vec!["/admin/login"]);
        assert_eq!(loc.history_len(), 1);

        loc.push("/admin/gallery");
        assert_eq!(loc.history_len(), 2);
    }

    #[test]
    fn undecodable_pair_is_dropped() {
        let loc = BrowserLocation::new("/admin?q=%FF%FE&x=1");
        assert_eq!(loc.query_param("q"), None);
        assert_eq!(loc.query_param("x").as_deref(), Some("1"));
    }
}
