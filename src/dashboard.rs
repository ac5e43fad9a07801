//! Dashboard controller
//!
//! One [`DashboardSession`] exists per page load and owns everything the
//! dashboard shows: fetched data, the three components and the document they
//! are mounted in. Nothing lives in module-level state.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, warn};
use serde::Serialize;

use crate::date_utils::{format_display, format_iso};
use crate::document::{Document, ListenerOwner, MountId};
use crate::heatmap::{self, Heatmap};
use crate::modal::Modal;
use crate::model::{Task, TaskCounts, TasksByDate};
use crate::sidebar::{Sidebar, select_upcoming};
use crate::view::{Action, Node};

#[cfg(feature = "web")]
use crate::api::{ApiClient, ApiError};

/// Hands out day-request tokens; only the newest token may open the modal
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token newer than every token issued before
    pub fn next(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, token: u64) -> bool {
        self.latest() == token
    }
}

/// An in-flight fetch of one day's tasks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayRequest {
    pub token: u64,
    pub date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DayOutcome {
    /// The modal now shows `count` tasks for `date`
    Opened { date: NaiveDate, count: usize },

    /// A newer request superseded this one; nothing changed
    Stale,

    /// The fetch failed; the dashboard is untouched apart from the notice
    Failed(String),
}

/// Everything fetched when the dashboard loads
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoardData {
    pub counts: TaskCounts,
    pub by_date: TasksByDate,
    pub upcoming: Vec<Task>,
}

#[cfg(feature = "web")]
impl BoardData {
    /// Fetch counts, per-date tasks and upcoming tasks concurrently
    ///
    /// The three requests succeed or fail together.
    pub async fn fetch(api: &ApiClient, year: i32, limit: Option<u32>) -> Result<Self, ApiError> {
        let (counts, by_date, upcoming) = tokio::try_join!(
            api.get_task_counts(Some(year)),
            api.get_tasks_by_date(Some(year)),
            api.get_upcoming_tasks(limit),
        )?;
        Ok(BoardData {
            counts,
            by_date,
            upcoming,
        })
    }
}

/// Rendered fragments handed to the page template
#[derive(Clone, Debug, Serialize)]
pub struct DashboardPage {
    pub year: i32,
    pub heatmap: String,
    pub legend: String,
    pub sidebar: String,
    pub modal: Option<String>,
    pub notice: Option<String>,
    pub departments: Vec<DepartmentOption>,
    pub department: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DepartmentOption {
    pub name: String,
    pub selected: bool,
}

pub struct DashboardSession {
    year: i32,
    today: NaiveDate,
    limit: Option<usize>,
    data: BoardData,
    department: Option<String>,
    heatmap: Heatmap,
    sidebar: Sidebar,
    modal: Modal,
    doc: Document,
    heatmap_mount: MountId,
    sidebar_mount: MountId,
    tracker: RequestTracker,
    notice: Option<String>,
}

impl DashboardSession {
    /// Empty dashboard with both components mounted
    pub fn new(year: i32, today: NaiveDate) -> Self {
        let mut heatmap = Heatmap::new(year);
        heatmap.set_on_day_click(|date, count| Action::OpenDay { date, count });
        let sidebar = Sidebar::new(today);

        let mut doc = Document::new();
        let heatmap_mount = doc.mount(heatmap.render());
        let sidebar_mount = doc.mount(sidebar.render());

        DashboardSession {
            year,
            today,
            limit: None,
            data: BoardData::default(),
            department: None,
            heatmap,
            sidebar,
            modal: Modal::new(),
            doc,
            heatmap_mount,
            sidebar_mount,
            tracker: RequestTracker::new(),
            notice: None,
        }
    }

    /// Cap the sidebar length when a department filter rebuilds it
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Load the board for `year`; any failed request fails the whole load
    #[cfg(feature = "web")]
    pub async fn fetch(api: &ApiClient, year: i32, limit: Option<u32>) -> Result<Self, ApiError> {
        let data = BoardData::fetch(api, year, limit).await?;
        let mut session =
            Self::new(year, crate::date_utils::today()).with_limit(limit.map(|l| l as usize));
        session.apply(data);
        Ok(session)
    }

    /// Replace the board data and re-render both components
    pub fn apply(&mut self, data: BoardData) {
        debug!(
            "dashboard data: {} days with tasks, {} upcoming",
            data.counts.len(),
            data.upcoming.len()
        );
        self.data = data;
        self.refresh();
    }

    /// Restrict the board to one department, or lift the restriction with `None`
    ///
    /// An empty name counts as no filter.
    pub fn set_department(&mut self, department: Option<String>) {
        self.department = department.filter(|d| !d.trim().is_empty());
        self.refresh();
    }

    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    /// Departments seen in the loaded data, sorted
    pub fn departments(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .data
            .by_date
            .values()
            .flatten()
            .chain(self.data.upcoming.iter())
            .map(|t| t.department.as_str())
            .filter(|d| !d.trim().is_empty())
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    fn matches_department(&self, task: &Task) -> bool {
        self.department
            .as_deref()
            .is_none_or(|d| task.department == d)
    }

    fn refresh(&mut self) {
        let (counts, upcoming) = match &self.department {
            None => (self.data.counts.clone(), self.data.upcoming.clone()),
            Some(_) => {
                let mut counts = TaskCounts::new();
                let mut candidates = Vec::new();
                for (date, tasks) in &self.data.by_date {
                    let matching: Vec<&Task> =
                        tasks.iter().filter(|t| self.matches_department(t)).collect();
                    if !matching.is_empty() {
                        counts.insert(date.clone(), matching.len() as u32);
                    }
                    candidates.extend(matching.into_iter().cloned());
                }
                (counts, select_upcoming(&candidates, self.today, self.limit))
            }
        };

        self.heatmap.set_task_counts(counts);
        self.sidebar.set_tasks(upcoming);
        self.doc.replace(self.heatmap_mount, self.heatmap.render());
        self.doc.replace(self.sidebar_mount, self.sidebar.render());
    }

    /// Start a day fetch; any earlier request still in flight becomes stale
    pub fn begin_day_request(&self, date: NaiveDate) -> DayRequest {
        DayRequest {
            token: self.tracker.next(),
            date,
        }
    }

    /// Apply the result of a day fetch if it is still the newest request
    pub fn complete_day_request<E: std::fmt::Display>(
        &mut self,
        request: DayRequest,
        result: Result<Vec<Task>, E>,
    ) -> DayOutcome {
        if !self.tracker.is_latest(request.token) {
            debug!(
                "dropping stale response for {} (token {}, latest {})",
                request.date,
                request.token,
                self.tracker.latest()
            );
            return DayOutcome::Stale;
        }

        match result {
            Ok(tasks) => {
                let tasks: Vec<Task> = tasks
                    .into_iter()
                    .filter(|t| self.matches_department(t))
                    .collect();
                self.modal.open(&mut self.doc, request.date, &tasks);
                self.notice = None;
                DayOutcome::Opened {
                    date: request.date,
                    count: tasks.len(),
                }
            }
            Err(err) => {
                warn!("failed to load tasks for {}: {}", format_iso(request.date), err);
                let message = format!(
                    "Could not load tasks for {}: {}",
                    format_display(Some(request.date)),
                    err
                );
                self.notice = Some(message.clone());
                DayOutcome::Failed(message)
            }
        }
    }

    /// Fetch one day's tasks and open the modal with them
    #[cfg(feature = "web")]
    pub async fn open_day(&mut self, api: &ApiClient, date: NaiveDate) -> DayOutcome {
        let request = self.begin_day_request(date);
        let result = api.get_tasks_for_date(date).await;
        self.complete_day_request(request, result)
    }

    /// Click on the node at `path` of a mounted subtree
    ///
    /// Modal controls are handled here. A day click is returned so the
    /// caller can fetch the day and call [`Self::complete_day_request`].
    pub fn click(&mut self, mount: MountId, path: &[usize]) -> Option<Action> {
        let action = self.doc.click(mount, path)?;
        match action {
            Action::CloseModal | Action::DismissOverlay => {
                self.modal.handle_action(&mut self.doc, &action);
            }
            Action::OpenDay { .. } => {}
        }
        Some(action)
    }

    pub fn key_down(&mut self, key: &str) {
        for owner in self.doc.key_down(key) {
            match owner {
                ListenerOwner::Modal => self.modal.handle_key(&mut self.doc, key),
            }
        }
    }

    /// Re-sync the sidebar list height to the heatmap height
    pub fn resize(&mut self, heatmap_height: u32) -> Option<u32> {
        Sidebar::sync_height(&mut self.doc, self.sidebar_mount, heatmap_height)
    }

    pub fn advance(&mut self, by: Duration) {
        self.doc.advance(by);
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn data(&self) -> &BoardData {
        &self.data
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn heatmap_mount(&self) -> MountId {
        self.heatmap_mount
    }

    pub fn sidebar_mount(&self) -> MountId {
        self.sidebar_mount
    }

    fn mounted_html(&self, mount: MountId) -> String {
        self.doc.node(mount).map(Node::to_html).unwrap_or_default()
    }

    pub fn page(&self) -> DashboardPage {
        DashboardPage {
            year: self.year,
            heatmap: self.mounted_html(self.heatmap_mount),
            legend: heatmap::legend().to_html(),
            sidebar: self.mounted_html(self.sidebar_mount),
            modal: self.modal.overlay().map(|m| self.mounted_html(m)),
            notice: self.notice.clone(),
            departments: self
                .departments()
                .into_iter()
                .map(|name| DepartmentOption {
                    selected: self.department.as_deref() == Some(name.as_str()),
                    name,
                })
                .collect(),
            department: self.department.clone(),
        }
    }
}
