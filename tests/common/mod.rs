//! Common test utilities for integration tests.

#![allow(dead_code)]

pub mod harness;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use blueprint_canvas::{Config, SaveReasonFlags};

/// Records calls to the persistence hooks.
#[derive(Default, Clone)]
pub struct SaveTracker {
    /// Last blob handed to the save hook
    pub blob: Rc<RefCell<Option<Vec<u8>>>>,
    /// Reasons of every whole-blob save
    pub saves: Rc<RefCell<Vec<SaveReasonFlags>>>,
    /// (node key, reasons) of every per-node save
    pub node_saves: Rc<RefCell<Vec<(String, SaveReasonFlags)>>>,
    /// Count of begin/end session pairs
    pub sessions: Rc<Cell<usize>>,
    /// Makes the save hook report failure
    pub fail: Rc<Cell<bool>>,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install recording save hooks into `config`.
    pub fn install(&self, config: Config) -> Config {
        let blob = self.blob.clone();
        let saves = self.saves.clone();
        let fail = self.fail.clone();
        let node_saves = self.node_saves.clone();
        let sessions = self.sessions.clone();
        config
            .with_save_session(move || sessions.set(sessions.get() + 1), || {})
            .with_save_settings(move |bytes, reasons| {
                saves.borrow_mut().push(reasons);
                if fail.get() {
                    return false;
                }
                *blob.borrow_mut() = Some(bytes.to_vec());
                true
            })
            .with_save_node_settings(move |key, _, reasons| {
                node_saves.borrow_mut().push((key.to_owned(), reasons));
                true
            })
    }

    /// The last saved blob.
    pub fn last_blob(&self) -> Vec<u8> {
        self.blob.borrow().clone().expect("nothing was saved")
    }

    /// Clear all recorded calls.
    pub fn clear(&self) {
        *self.blob.borrow_mut() = None;
        self.saves.borrow_mut().clear();
        self.node_saves.borrow_mut().clear();
        self.sessions.set(0);
    }
}
