use crate::domain::ports::SelectionStore;
use crate::FormError;
use serde::{Deserialize, Serialize};

/// Store key of the selected account
pub const SELECTED_ACCOUNT_KEY: &str = "selectedAccount";

/// Store key of the selected branch
pub const SELECTED_BRANCH_KEY: &str = "selectedBranch";

/// An explicit user selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Account the form operates on
    Account(String),
    /// Branch the request is addressed to
    Branch(String),
}

impl Selection {
    pub fn key(&self) -> &'static str {
        match self {
            Selection::Account(_) => SELECTED_ACCOUNT_KEY,
            Selection::Branch(_) => SELECTED_BRANCH_KEY,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Selection::Account(v) | Selection::Branch(v) => v,
        }
    }

    /// Write the selection through to the store
    pub async fn persist(&self, store: &dyn SelectionStore) -> Result<(), FormError> {
        store.set(self.key(), self.value()).await
    }
}

/// Selected account and branch for one session.
///
/// Loaded from the [`SelectionStore`] when the session starts and changed only
/// by explicit selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub selected_account: Option<String>,
    pub selected_branch: Option<String>,
}

impl SessionContext {
    /// Read the cached selections
    pub async fn load(store: &dyn SelectionStore) -> Result<Self, FormError> {
        Ok(Self {
            selected_account: store.get(SELECTED_ACCOUNT_KEY).await?,
            selected_branch: store.get(SELECTED_BRANCH_KEY).await?,
        })
    }

    /// Apply a selection; returns true when the value changed
    pub fn apply(&mut self, selection: &Selection) -> bool {
        let slot = match selection {
            Selection::Account(_) => &mut self.selected_account,
            Selection::Branch(_) => &mut self.selected_branch,
        };
        if slot.as_deref() == Some(selection.value()) {
            return false;
        }
        *slot = Some(selection.value().to_string());
        true
    }
}
