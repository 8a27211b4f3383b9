//! The observable container that owns the current snapshot.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{Action, AppSnapshot, reduce};

/// Holds the current [AppSnapshot] and notifies watchers of every change.
///
/// Clones share the same state, so a store can be handed to subscriptions and the UI alike.
#[derive(Debug, Clone)]
pub struct Store {
    sender: Arc<watch::Sender<Arc<AppSnapshot>>>,
}

impl Store {
    /// Create a store holding `initial`.
    pub fn new(initial: AppSnapshot) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));

        Self {
            sender: Arc::new(sender),
        }
    }

    /// Apply `action` to the current snapshot.
    ///
    /// Watchers are notified even if the action left the snapshot unchanged.
    pub fn dispatch(&self, action: Action) {
        self.sender.send_modify(|snapshot| {
            let current = AppSnapshot::clone(snapshot);
            *snapshot = Arc::new(reduce(current, action));
        });
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<AppSnapshot> {
        self.sender.borrow().clone()
    }

    /// Watch for new snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AppSnapshot>> {
        self.sender.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppSnapshot::default())
    }
}

#[cfg(test)]
mod store_tests {
    use crate::{Action, Store, family::test_utils::user};

    #[test]
    fn clones_share_state() {
        let store = Store::default();
        let other = store.clone();

        other.dispatch(Action::SetCurrentUser(Some(user("alice", true))));

        assert_eq!(store.snapshot().current_user, Some(user("alice", true)));
    }

    #[tokio::test]
    async fn watchers_see_each_dispatch() {
        let store = Store::default();
        let mut receiver = store.subscribe();

        store.dispatch(Action::AddUser(user("alice", true)));

        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow_and_update().users, vec![user("alice", true)]);
    }
}
