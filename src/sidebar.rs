use chrono::NaiveDate;

use crate::date_utils::{days_between, format_display, is_within_days};
use crate::document::{Document, MountId};
use crate::model::Task;
use crate::view::{Element, Node};

/// Vertical space reserved for the sidebar header when syncing heights
pub const HEADER_ALLOWANCE: u32 = 100;

/// Tasks this close to today (inclusive) are flagged urgent
pub const URGENT_WITHIN_DAYS: i64 = 3;

/// Upcoming-tasks list
///
/// The caller hands over tasks already filtered to today-or-later and sorted
/// by date; the sidebar renders them in the order given.
pub struct Sidebar {
    tasks: Vec<Task>,
    today: NaiveDate,
}

impl Sidebar {
    pub fn new(today: NaiveDate) -> Self {
        Sidebar {
            tasks: Vec::new(),
            today,
        }
    }

    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn render(&self) -> Node {
        let header = Element::new("div")
            .class("sidebar-header")
            .child(Element::new("h2").text("Upcoming"))
            .child(
                Element::new("p")
                    .class("subtitle")
                    .text(format!("Red: due within {} days", URGENT_WITHIN_DAYS)),
            );

        let list = if self.tasks.is_empty() {
            Element::new("div")
                .class("sidebar-tasks")
                .child(Element::new("div").class("empty-message").text("No upcoming tasks"))
        } else {
            Element::new("div")
                .class("sidebar-tasks")
                .children(self.tasks.iter().map(|task| task_card(task, self.today)))
        };

        Element::new("div")
            .class("sidebar")
            .child(header)
            .child(list)
            .into()
    }

    /// Cap the scrollable list of the mounted sidebar to a sibling's height
    ///
    /// Purely cosmetic. Returns the applied height in pixels, or `None` when
    /// the mount is gone or holds no task list.
    pub fn sync_height(doc: &mut Document, mount: MountId, sibling_height: u32) -> Option<u32> {
        let height = max_list_height(sibling_height);
        let list = doc.node_mut(mount)?.find_by_class_mut("sidebar-tasks")?;
        list.set_style("max-height", format!("{}px", height));
        Some(height)
    }
}

pub fn max_list_height(sibling_height: u32) -> u32 {
    sibling_height.saturating_sub(HEADER_ALLOWANCE)
}

fn task_card(task: &Task, today: NaiveDate) -> Element {
    let offset = task.warning_date.map(|d| days_between(today, d));
    let urgent = task
        .warning_date
        .is_some_and(|d| is_within_days(today, d, URGENT_WITHIN_DAYS));

    let badge = match offset {
        Some(0) => Element::new("div").class("days-badge").class("today").text("Today"),
        Some(days) => Element::new("div").class("days-badge").text(days.to_string()),
        None => Element::new("div").class("days-badge").text("-"),
    };

    let content = Element::new("div")
        .class("task-content")
        .child(Element::new("div").class("task-department").text(task.department.as_str()))
        .child(Element::new("div").class("task-description").text(task.content.as_str()))
        .child(Element::new("div").class("task-date").text(format_display(task.warning_date)));

    let mut card = Element::new("div").class("task-card").child(badge).child(content);
    if urgent {
        card.add_class("urgent");
    }
    card
}

/// Tasks dated today or later, ascending by date
///
/// Equal dates keep their input order. Undated tasks are dropped.
pub fn select_upcoming(tasks: &[Task], today: NaiveDate, limit: Option<usize>) -> Vec<Task> {
    let mut upcoming: Vec<Task> = tasks
        .iter()
        .filter(|t| t.warning_date.is_some_and(|d| d >= today))
        .cloned()
        .collect();
    upcoming.sort_by_key(|t| t.warning_date);
    if let Some(limit) = limit {
        upcoming.truncate(limit);
    }
    upcoming
}
