use std::time::Duration;

use chrono::NaiveDate;
use log::debug;

use crate::date_utils::format_display;
use crate::document::{Document, ListenerId, ListenerOwner, MountId, TimerAction, TimerId};
use crate::model::Task;
use crate::view::{Action, Element, Node};

/// Time between closing and removing the overlay
pub const EXIT_ANIMATION: Duration = Duration::from_millis(300);

/// Delay before the `active` class is added so the entry transition runs
pub const ENTER_DELAY: Duration = Duration::from_millis(10);

/// Bucket for tasks without a department
pub const OTHER_DEPARTMENT: &str = "Other";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Open { date: NaiveDate },
}

/// Tasks of one department, in the order they arrived
#[derive(Debug, PartialEq)]
pub struct DepartmentGroup<'a> {
    pub department: &'a str,
    pub tasks: Vec<&'a Task>,
}

/// Group tasks by department, keeping first-seen department order
pub fn group_by_department(tasks: &[Task]) -> Vec<DepartmentGroup<'_>> {
    let mut groups: Vec<DepartmentGroup<'_>> = Vec::new();
    for task in tasks {
        let department = if task.department.trim().is_empty() {
            OTHER_DEPARTMENT
        } else {
            task.department.as_str()
        };
        match groups.iter_mut().find(|g| g.department == department) {
            Some(group) => group.tasks.push(task),
            None => groups.push(DepartmentGroup {
                department,
                tasks: vec![task],
            }),
        }
    }
    groups
}

/// Overlay tree for one day
pub fn view(date: NaiveDate, tasks: &[Task]) -> Node {
    let header = Element::new("div")
        .class("modal-header")
        .child(Element::new("h2").text(format!("Tasks on {}", format_display(Some(date)))))
        .child(
            Element::new("p")
                .class("task-count-label")
                .text(format!("{} tasks", tasks.len())),
        );

    let body = Element::new("div")
        .class("modal-body")
        .children(group_by_department(tasks).into_iter().map(|group| {
            Element::new("div")
                .class("dept-section")
                .child(
                    Element::new("h3")
                        .class("dept-header")
                        .text(format!("{} ({})", group.department, group.tasks.len())),
                )
                .child(
                    Element::new("ul").class("task-list").children(
                        group
                            .tasks
                            .iter()
                            .map(|t| {
                                Element::new("li").class("task-item").text(t.content.as_str())
                            }),
                    ),
                )
        }));

    let content = Element::new("div")
        .class("modal-content")
        .child(
            Element::new("button")
                .class("modal-close")
                .attr("type", "button")
                .attr("aria-label", "Close")
                .on_click(Action::CloseModal)
                .text("\u{00d7}"),
        )
        .child(header)
        .child(body);

    Element::new("div")
        .class("modal-overlay")
        .on_click(Action::DismissOverlay)
        .child(content)
        .into()
}

/// Day-detail overlay
///
/// While open the modal owns exactly one mounted overlay and one Escape
/// listener registration. Closing gives both back: the listener at once, the
/// overlay once [`EXIT_ANIMATION`] has elapsed on the document clock.
#[derive(Debug)]
pub struct Modal {
    state: ModalState,
    overlay: Option<MountId>,
    escape_listener: Option<ListenerId>,
    enter_timer: Option<TimerId>,
}

impl Default for Modal {
    fn default() -> Self {
        Self::new()
    }
}

impl Modal {
    pub fn new() -> Self {
        Modal {
            state: ModalState::Closed,
            overlay: None,
            escape_listener: None,
            enter_timer: None,
        }
    }

    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ModalState::Open { .. })
    }

    /// Mount id of the overlay while open
    pub fn overlay(&self) -> Option<MountId> {
        self.overlay
    }

    pub fn open(&mut self, doc: &mut Document, date: NaiveDate, tasks: &[Task]) {
        if self.is_open() {
            self.close(doc);
        }

        let overlay = doc.mount(view(date, tasks));
        self.enter_timer = Some(doc.schedule(
            ENTER_DELAY,
            TimerAction::AddClass {
                mount: overlay,
                class: "active",
            },
        ));

        self.overlay = Some(overlay);
        self.escape_listener = Some(doc.add_key_listener(ListenerOwner::Modal));
        self.state = ModalState::Open { date };
        debug!("modal opened for {} ({} tasks)", date, tasks.len());
    }

    /// Close the modal. A no-op when already closed.
    pub fn close(&mut self, doc: &mut Document) {
        if !self.is_open() {
            return;
        }

        if let Some(listener) = self.escape_listener.take() {
            doc.remove_key_listener(listener);
        }
        if let Some(timer) = self.enter_timer.take() {
            doc.cancel(timer);
        }
        if let Some(overlay) = self.overlay.take() {
            if let Some(e) = doc.node_mut(overlay).and_then(Node::as_element_mut) {
                e.remove_class("active");
            }
            doc.schedule(EXIT_ANIMATION, TimerAction::Unmount(overlay));
        }

        self.state = ModalState::Closed;
    }

    /// Key press routed from the document listener registry
    pub fn handle_key(&mut self, doc: &mut Document, key: &str) {
        if key == "Escape" && self.is_open() {
            self.close(doc);
        }
    }

    /// Action resolved from a click inside the overlay
    pub fn handle_action(&mut self, doc: &mut Document, action: &Action) {
        match action {
            Action::CloseModal | Action::DismissOverlay => self.close(doc),
            Action::OpenDay { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task::new("A", "first", Some(date())),
            Task::new("B", "second", Some(date())),
        ]
    }

    #[test]
    fn grouping_keeps_first_seen_order_and_buckets_missing_departments() {
        let tasks = vec![
            Task::new("Ops", "1", None),
            Task::new("", "2", None),
            Task::new("Finance", "3", None),
            Task::new("Ops", "4", None),
        ];
        let groups = group_by_department(&tasks);
        let names: Vec<&str> = groups.iter().map(|g| g.department).collect();
        assert_eq!(names, vec!["Ops", OTHER_DEPARTMENT, "Finance"]);
        assert_eq!(groups[0].tasks.len(), 2);
    }

    #[test]
    fn one_section_per_department() {
        let mut doc = Document::new();
        let mut modal = Modal::new();
        modal.open(&mut doc, date(), &tasks());

        let overlay = doc.node(modal.overlay().unwrap()).unwrap();
        let sections = overlay.find_all_by_class("dept-section");
        assert_eq!(sections.len(), 2);
        for section in sections {
            let node = Node::Element(section.clone());
            assert_eq!(node.find_all_by_class("task-item").len(), 1);
        }
        assert!(overlay.text_content().contains("Tasks on 05/03/2026"));
        assert!(overlay.text_content().contains("A (1)"));
    }

    #[test]
    fn reopening_replaces_instead_of_stacking() {
        let mut doc = Document::new();
        let mut modal = Modal::new();
        modal.open(&mut doc, date(), &tasks());
        let first = modal.overlay().unwrap();
        modal.open(&mut doc, date(), &tasks()[..1]);

        assert_ne!(modal.overlay(), Some(first));
        assert_eq!(doc.key_listener_count(), 1);
        doc.advance(EXIT_ANIMATION);
        assert!(!doc.is_mounted(first));
        assert_eq!(doc.mounted_count(), 1);
    }

    #[test]
    fn entry_transition_adds_active_class() {
        let mut doc = Document::new();
        let mut modal = Modal::new();
        modal.open(&mut doc, date(), &tasks());
        let overlay = modal.overlay().unwrap();

        let is_active = |doc: &Document| {
            doc.node(overlay)
                .and_then(Node::as_element)
                .is_some_and(|e| e.has_class("active"))
        };
        assert!(!is_active(&doc));
        doc.advance(ENTER_DELAY);
        assert!(is_active(&doc));
    }

    #[derive(Clone, Copy, Debug)]
    enum CloseVia {
        Escape,
        Overlay,
        Button,
    }

    fn close_via(doc: &mut Document, modal: &mut Modal, how: CloseVia) {
        let overlay = modal.overlay().unwrap();
        match how {
            CloseVia::Escape => {
                for owner in doc.key_down("Escape") {
                    assert_eq!(owner, ListenerOwner::Modal);
                    modal.handle_key(doc, "Escape");
                }
            }
            CloseVia::Overlay => {
                let action = doc.click(overlay, &[]).unwrap();
                modal.handle_action(doc, &action);
            }
            CloseVia::Button => {
                let path = doc.node(overlay).unwrap().path_to_class("modal-close").unwrap();
                let action = doc.click(overlay, &path).unwrap();
                modal.handle_action(doc, &action);
            }
        }
    }

    #[test]
    fn every_close_path_reaches_the_same_terminal_state() {
        for how in [CloseVia::Escape, CloseVia::Overlay, CloseVia::Button] {
            let mut doc = Document::new();
            let mut modal = Modal::new();

            for _ in 0..2 {
                modal.open(&mut doc, date(), &tasks());
                doc.advance(ENTER_DELAY);
                assert_eq!(doc.key_listener_count(), 1, "{:?}", how);

                close_via(&mut doc, &mut modal, how);
                assert_eq!(modal.state(), ModalState::Closed, "{:?}", how);
                assert_eq!(doc.key_listener_count(), 0, "{:?}", how);

                doc.advance(EXIT_ANIMATION);
                assert_eq!(doc.mounted_count(), 0, "{:?}", how);
            }
        }
    }

    #[test]
    fn clicks_inside_the_panel_keep_it_open() {
        let mut doc = Document::new();
        let mut modal = Modal::new();
        modal.open(&mut doc, date(), &tasks());
        let overlay = modal.overlay().unwrap();

        let path = doc.node(overlay).unwrap().path_to_class("task-item").unwrap();
        assert_eq!(doc.click(overlay, &path), None);
        let panel = doc.node(overlay).unwrap().path_to_class("modal-content").unwrap();
        assert_eq!(doc.click(overlay, &panel), None);
        assert!(modal.is_open());
    }

    #[test]
    fn other_keys_and_double_close_are_ignored() {
        let mut doc = Document::new();
        let mut modal = Modal::new();
        modal.open(&mut doc, date(), &tasks());
        modal.handle_key(&mut doc, "Enter");
        assert!(modal.is_open());

        modal.close(&mut doc);
        modal.close(&mut doc);
        assert_eq!(doc.pending_timers(), 1);
    }

    #[test]
    fn closing_before_the_entry_delay_keeps_the_overlay_inactive() {
        let mut doc = Document::new();
        let mut modal = Modal::new();
        modal.open(&mut doc, date(), &tasks());
        let overlay = modal.overlay().unwrap();

        modal.close(&mut doc);
        doc.advance(ENTER_DELAY);
        let element = doc.node(overlay).and_then(Node::as_element).unwrap();
        assert!(!element.has_class("active"));

        doc.advance(EXIT_ANIMATION);
        assert!(!doc.is_mounted(overlay));
    }
}
