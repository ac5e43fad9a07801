//! In-process host for rendered views
//!
//! The document owns mounted subtrees, the registry of key listeners and the
//! timers that drive cosmetic transitions. Time only moves through
//! [`Document::advance`], so transitions are deterministic.

use std::time::Duration;

use log::debug;

use crate::view::{Action, Node};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Component that registered a key listener
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerOwner {
    Modal,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TimerAction {
    Unmount(MountId),
    AddClass { mount: MountId, class: &'static str },
}

#[derive(Debug)]
struct Timer {
    id: TimerId,
    due: Duration,
    action: TimerAction,
}

#[derive(Debug, Default)]
pub struct Document {
    mounts: Vec<(MountId, Node)>,
    key_listeners: Vec<(ListenerId, ListenerOwner)>,
    timers: Vec<Timer>,
    clock: Duration,
    next_id: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Attach a subtree at the end of the body
    pub fn mount(&mut self, node: Node) -> MountId {
        let id = MountId(self.next_id());
        self.mounts.push((id, node));
        id
    }

    /// Replace a mounted subtree wholesale. Returns false if `id` is not mounted.
    pub fn replace(&mut self, id: MountId, node: Node) -> bool {
        match self.node_mut(id) {
            Some(slot) => {
                *slot = node;
                true
            }
            None => false,
        }
    }

    pub fn unmount(&mut self, id: MountId) -> Option<Node> {
        let index = self.mounts.iter().position(|(m, _)| *m == id)?;
        Some(self.mounts.remove(index).1)
    }

    pub fn node(&self, id: MountId) -> Option<&Node> {
        self.mounts.iter().find(|(m, _)| *m == id).map(|(_, n)| n)
    }

    pub fn node_mut(&mut self, id: MountId) -> Option<&mut Node> {
        self.mounts
            .iter_mut()
            .find(|(m, _)| *m == id)
            .map(|(_, n)| n)
    }

    pub fn is_mounted(&self, id: MountId) -> bool {
        self.node(id).is_some()
    }

    pub fn mounted_count(&self) -> usize {
        self.mounts.len()
    }

    /// Register a document-level key listener
    ///
    /// The returned id is the only way to unregister it; owners must keep it
    /// and pass it to [`Document::remove_key_listener`].
    pub fn add_key_listener(&mut self, owner: ListenerOwner) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.key_listeners.push((id, owner));
        id
    }

    pub fn remove_key_listener(&mut self, id: ListenerId) -> bool {
        let before = self.key_listeners.len();
        self.key_listeners.retain(|(l, _)| *l != id);
        before != self.key_listeners.len()
    }

    pub fn key_listener_count(&self) -> usize {
        self.key_listeners.len()
    }

    /// Owners to notify for a key press, in registration order
    pub fn key_down(&self, key: &str) -> Vec<ListenerOwner> {
        debug!("key down: {}", key);
        self.key_listeners.iter().map(|(_, owner)| *owner).collect()
    }

    pub fn schedule(&mut self, after: Duration, action: TimerAction) -> TimerId {
        let id = TimerId(self.next_id());
        self.timers.push(Timer {
            id,
            due: self.clock + after,
            action,
        });
        id
    }

    /// Drop a timer that has not fired yet
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn now(&self) -> Duration {
        self.clock
    }

    /// Move the clock forward and fire every timer that came due, oldest first
    pub fn advance(&mut self, by: Duration) {
        self.clock += by;
        let now = self.clock;

        let (mut due, pending): (Vec<Timer>, Vec<Timer>) =
            self.timers.drain(..).partition(|t| t.due <= now);
        self.timers = pending;
        due.sort_by_key(|t| t.due);

        for timer in due {
            match timer.action {
                TimerAction::Unmount(id) => {
                    self.unmount(id);
                }
                TimerAction::AddClass { mount, class } => {
                    if let Some(e) = self.node_mut(mount).and_then(Node::as_element_mut) {
                        e.add_class(class);
                    }
                }
            }
        }
    }

    /// Dispatch a click on the node at `path` inside a mounted subtree
    ///
    /// The click bubbles from the target towards the mount root and resolves to
    /// the first action found. [`Action::DismissOverlay`] only resolves when its
    /// element is the target itself.
    pub fn click(&self, id: MountId, path: &[usize]) -> Option<Action> {
        let root = self.node(id)?;
        root.get(path)?;

        for depth in (0..=path.len()).rev() {
            let Some(element) = root.get(&path[..depth]).and_then(Node::as_element) else {
                continue;
            };
            if let Some(action) = &element.action {
                if depth == path.len() || action.fires_from_descendants() {
                    return Some(action.clone());
                }
            }
        }
        None
    }
}
