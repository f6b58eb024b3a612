//! Search producer and consumers on top of the [`SearchBus`].
//!
//! - [`SearchInput`] (top bar): every keystroke updates its value, the `q` parameter
//!   (replace, removed when empty) and broadcasts
//! - [`SearchFilter`]: consumer side; starts from the URL, then follows broadcasts
//! - [`ListView`] / [`DashboardView`]: filter already-loaded rows locally

use super::search_bus::{SearchBus, SearchSubscription};
use crate::domain::search::{ProjectCard, filter_items};
use crate::domain::{
    ActivityEntry, GalleryImage, Project, SEARCH_PARAM, SearchQuery, Searchable,
};
use crate::ports::AddressBarPort;
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::debug;

/// Current `q` parameter; empty when missing.
pub fn read_query(address_bar: &dyn AddressBarPort) -> SearchQuery {
    SearchQuery::from_optional(address_bar.query_param(SEARCH_PARAM).as_deref())
}

/// The search box. Sole producer on the bus.
pub struct SearchInput {
    value: String,
    bus: SearchBus,
    address_bar: Arc<dyn AddressBarPort>,
}

impl SearchInput {
    /// Adopt the URL value and announce it to consumers.
    pub fn mount(bus: SearchBus, address_bar: Arc<dyn AddressBarPort>) -> Self {
        let initial = read_query(address_bar.as_ref());
        bus.publish(&initial);
        Self {
            value: initial.as_str().to_string(),
            bus,
            address_bar,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// One keystroke (or paste): no debounce.
    pub fn on_input(&mut self, text: &str) {
        self.value = text.to_string();
        let param = (!text.is_empty()).then_some(text);
        self.address_bar.replace_query_param(SEARCH_PARAM, param);
        debug!(query = text, "search input changed");
        self.bus.publish(&SearchQuery::new(text));
    }

    pub fn clear(&mut self) {
        self.on_input("");
    }
}

/// Consumer-side search state. Owned by exactly one view; dropping it unsubscribes.
pub struct SearchFilter {
    rx: watch::Receiver<SearchQuery>,
    _subscription: SearchSubscription,
}

impl SearchFilter {
    /// Subscribe, then seed from the URL unless a broadcast already arrived.
    pub fn mount(bus: &SearchBus, address_bar: &dyn AddressBarPort) -> Self {
        let (tx, rx) = watch::channel(SearchQuery::default());
        let tx = Arc::new(tx);
        let heard = Arc::new(AtomicBool::new(false));

        let subscription = {
            let tx = Arc::clone(&tx);
            let heard = Arc::clone(&heard);
            bus.subscribe(move |q| {
                heard.store(true, Ordering::SeqCst);
                tx.send_replace(q.clone());
            })
        };

        let from_url = read_query(address_bar);
        tx.send_if_modified(|current| {
            if heard.load(Ordering::SeqCst) {
                return false;
            }
            *current = from_url;
            true
        });

        Self {
            rx,
            _subscription: subscription,
        }
    }

    pub fn query(&self) -> SearchQuery {
        self.rx.borrow().clone()
    }

    /// Receiver that wakes on every new query (e.g. to re-render).
    pub fn changes(&self) -> watch::Receiver<SearchQuery> {
        self.rx.clone()
    }
}

/// A list screen filtering its own loaded rows.
pub struct ListView<T> {
    items: Vec<T>,
    filter: SearchFilter,
}

/// Admin projects screen: title, slug, description, tags.
pub type ProjectsView = ListView<Project>;

/// Admin gallery screen: image title.
pub type GalleryView = ListView<GalleryImage>;

impl<T: Searchable> ListView<T> {
    pub fn mount(bus: &SearchBus, address_bar: &dyn AddressBarPort) -> Self {
        Self {
            items: Vec::new(),
            filter: SearchFilter::mount(bus, address_bar),
        }
    }

    /// Replace the loaded rows (after a fetch or a mutation).
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn query(&self) -> SearchQuery {
        self.filter.query()
    }

    pub fn visible(&self) -> Vec<&T> {
        filter_items(&self.items, &self.filter.query())
    }
}

const TOP_PROJECTS: usize = 5;

/// Dashboard figures derived from the admin's projects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    /// First five projects, newest first.
    pub top_projects: Vec<Project>,
    pub recent_activity: Vec<ActivityEntry>,
    /// Top projects created in the month of `now`.
    pub monthly_projects: Vec<Project>,
}

/// Metric card figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectCounts {
    pub total: usize,
    pub published: usize,
    pub drafts: usize,
}

impl ProjectCounts {
    fn of(projects: &[&Project]) -> Self {
        let published = projects.iter().filter(|p| p.published).count();
        Self {
            total: projects.len(),
            published,
            drafts: projects.len() - published,
        }
    }
}

impl DashboardData {
    /// `projects` must be newest first.
    pub fn from_projects(projects: &[Project], now: DateTime<Utc>) -> Self {
        let top_projects: Vec<Project> = projects.iter().take(TOP_PROJECTS).cloned().collect();
        let recent_activity = top_projects
            .iter()
            .map(|p| ActivityEntry {
                id: p.id.clone(),
                action: if p.published {
                    "Project published".to_string()
                } else {
                    "Project created".to_string()
                },
                project: non_empty_or(&p.title, "Untitled"),
                time: p
                    .created_at
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "Unknown".to_string()),
                slug: non_empty_or(&p.slug, "no-slug"),
            })
            .collect();
        let monthly_projects = top_projects
            .iter()
            .filter(|p| {
                p.created_at
                    .is_some_and(|d| d.year() == now.year() && d.month() == now.month())
            })
            .cloned()
            .collect();

        Self {
            top_projects,
            recent_activity,
            monthly_projects,
        }
    }
}

fn non_empty_or(s: &str, fallback: &str) -> String {
    if s.is_empty() {
        fallback.to_string()
    } else {
        s.to_string()
    }
}

/// Dashboard screen. Top projects match on title/slug, activity on project/action.
pub struct DashboardView {
    data: DashboardData,
    filter: SearchFilter,
}

impl DashboardView {
    pub fn mount(bus: &SearchBus, address_bar: &dyn AddressBarPort) -> Self {
        Self {
            data: DashboardData::default(),
            filter: SearchFilter::mount(bus, address_bar),
        }
    }

    pub fn set_data(&mut self, data: DashboardData) {
        self.data = data;
    }

    pub fn data(&self) -> &DashboardData {
        &self.data
    }

    /// Metric cards count the top projects that match the search.
    pub fn counts(&self) -> ProjectCounts {
        ProjectCounts::of(&self.top_projects())
    }

    pub fn query(&self) -> SearchQuery {
        self.filter.query()
    }

    pub fn top_projects(&self) -> Vec<&Project> {
        let cards: Vec<ProjectCard<'_>> = self.data.top_projects.iter().map(ProjectCard).collect();
        filter_items(&cards, &self.filter.query())
            .into_iter()
            .map(|c| c.0)
            .collect()
    }

    pub fn recent_activity(&self) -> Vec<&ActivityEntry> {
        filter_items(&self.data.recent_activity, &self.filter.query())
    }
}
