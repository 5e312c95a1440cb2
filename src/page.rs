//! Page State
//!
//! The state a controller mutates in place of a DOM: submit controls with
//! their label and disabled flag, notices shown to the user, pending
//! navigations, and rendered sections.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::view::ViewNode;

/// Label and enabled state of a button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub label: String,
    pub disabled: bool,
}

/// A shared handle to one button. Clones refer to the same control.
#[derive(Debug, Clone)]
pub struct Control {
    state: Arc<Mutex<ControlState>>,
}

impl Control {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControlState {
                label: label.into(),
                disabled: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> ControlState {
        self.lock().clone()
    }

    pub fn label(&self) -> String {
        self.lock().label.clone()
    }

    pub fn is_disabled(&self) -> bool {
        self.lock().disabled
    }

    /// Disable the control and show `busy_label` until the guard drops.
    /// Returns `None` while a previous guard is still alive.
    pub fn try_begin(&self, busy_label: &str) -> Option<BusyGuard> {
        let mut state = self.lock();
        if state.disabled {
            return None;
        }
        let previous = std::mem::replace(&mut state.label, busy_label.to_string());
        state.disabled = true;

        Some(BusyGuard {
            control: self.clone(),
            previous,
        })
    }
}

/// Restores the control's label and re-enables it when dropped, whichever
/// way the request ended.
#[derive(Debug)]
pub struct BusyGuard {
    control: Control,
    previous: String,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut state = self.control.lock();
        state.label = std::mem::take(&mut self.previous);
        state.disabled = false;
    }
}

/// A message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Success(String),
    Info(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Error(m) | Notice::Success(m) | Notice::Info(m) => m,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Navigate to `target`, optionally after a delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub target: String,
    pub delay: Duration,
}

impl Navigation {
    pub fn now(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(target: impl Into<String>, delay: Duration) -> Self {
        Self {
            target: target.into(),
            delay,
        }
    }

    /// Sleep out the delay and hand back the target
    pub async fn wait(self) -> String {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.target
    }
}

/// What a successful action leaves behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub notice: Option<Notice>,
    pub navigation: Option<Navigation>,
}

impl Completion {
    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            notice: None,
            navigation: Some(Navigation::now(target)),
        }
    }

    pub fn notice(notice: Notice) -> Self {
        Self {
            notice: Some(notice),
            navigation: None,
        }
    }

    pub fn then_navigate(mut self, target: impl Into<String>, delay: Duration) -> Self {
        self.navigation = Some(Navigation::after(target, delay));
        self
    }
}

#[derive(Debug, Default)]
struct SectionState {
    view: Option<ViewNode>,
    renders: u64,
}

/// One independently rendered region of a page. Writers replace the whole
/// view; concurrent writers resolve as last write wins.
#[derive(Debug, Clone, Default)]
pub struct Section {
    state: Arc<RwLock<SectionState>>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current view and store `view`
    pub async fn replace(&self, view: ViewNode) {
        let mut state = self.state.write().await;
        state.view = Some(view);
        state.renders += 1;
    }

    pub async fn view(&self) -> Option<ViewNode> {
        self.state.read().await.view.clone()
    }

    /// How many times a full view has been stored
    pub async fn renders(&self) -> u64 {
        self.state.read().await.renders
    }
}
