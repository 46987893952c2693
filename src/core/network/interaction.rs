//! Selection state for the "connect two entities" workflow.

use serde::{Deserialize, Serialize};

use crate::core::network::entity::EntityKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InteractionState {
    #[default]
    Idle,
    /// Connect mode with zero or one node chosen.
    Selecting { selected: Option<EntityKey> },
    /// Two distinct nodes chosen, in click order.
    ReadyToConnect { first: EntityKey, second: EntityKey },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Nodes currently selected, in click order.
    pub fn selection(&self) -> Vec<EntityKey> {
        match *self {
            Self::Idle | Self::Selecting { selected: None } => Vec::new(),
            Self::Selecting { selected: Some(key) } => vec![key],
            Self::ReadyToConnect { first, second } => vec![first, second],
        }
    }

    pub fn is_selected(&self, key: &EntityKey) -> bool {
        self.selection().contains(key)
    }

    /// The pair to connect, once two nodes are chosen.
    pub fn pair(&self) -> Option<(EntityKey, EntityKey)> {
        match *self {
            Self::ReadyToConnect { first, second } => Some((first, second)),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct InteractionMachine {
    state: InteractionState,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Enter connect mode. Has no effect outside `Idle`.
    pub fn begin(&mut self) {
        if self.state.is_idle() {
            self.state = InteractionState::Selecting { selected: None };
        }
    }

    /// Toggle `key` in the selection. Clicking a selected node deselects it;
    /// a third distinct node is ignored. Clicks while idle are ignored.
    pub fn toggle(&mut self, key: EntityKey) -> InteractionState {
        use InteractionState::*;

        self.state = match self.state {
            Idle => Idle,
            Selecting { selected: None } => Selecting { selected: Some(key) },
            Selecting { selected: Some(first) } if first == key => Selecting { selected: None },
            Selecting { selected: Some(first) } => ReadyToConnect { first, second: key },
            ReadyToConnect { first, second } if key == second => Selecting { selected: Some(first) },
            ReadyToConnect { first, second } if key == first => Selecting { selected: Some(second) },
            ready @ ReadyToConnect { .. } => ready,
        };
        self.state
    }

    /// Clear the selection and leave connect mode.
    pub fn cancel(&mut self) {
        self.state = InteractionState::Idle;
    }

    /// Called after a successful connect.
    pub fn complete(&mut self) -> Option<(EntityKey, EntityKey)> {
        let pair = self.state.pair();
        if pair.is_some() {
            self.state = InteractionState::Idle;
        }
        pair
    }
}
