// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Object registration boundary.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::pipeline::{ObjectId, ObjectKind};

/// Object-management interface the device registers its pipeline with.
pub trait ObjectRegistry: Send + Sync {
    /// Register an object and return its id.
    fn register(&self, kind: ObjectKind, name: &str) -> Result<ObjectId>;

    /// Remove a previously registered object.
    fn unregister(&self, id: ObjectId);
}

/// A registered object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub name: String,
}

struct TableState {
    next_id: u32,
    entries: Vec<ObjectEntry>,
}

/// In-process registry handing out sequential ids, starting at 1.
pub struct ModeObjectTable {
    state: Mutex<TableState>,
}

impl ModeObjectTable {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                next_id: 1,
                entries: Vec::new(),
            }),
        }
    }

    /// Registered objects in registration order.
    pub fn entries(&self) -> Vec<ObjectEntry> {
        self.state.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }
}

impl Default for ModeObjectTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry for ModeObjectTable {
    fn register(&self, kind: ObjectKind, name: &str) -> Result<ObjectId> {
        let mut state = self.state.lock();
        let id = ObjectId(state.next_id);
        state.next_id += 1;
        state.entries.push(ObjectEntry {
            id,
            kind,
            name: name.to_string(),
        });
        tracing::debug!(%id, %kind, name, "Registered mode object");
        Ok(id)
    }

    fn unregister(&self, id: ObjectId) {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|entry| entry.id != id);
        if state.entries.len() == before {
            tracing::warn!(%id, "Unregistering unknown mode object");
        } else {
            tracing::debug!(%id, "Unregistered mode object");
        }
    }
}
