//! Live subscriptions to a family and its expenses.

use std::sync::{Arc, Mutex};

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

use crate::{Change, Collection, Error, Expense, Family, FamilyId, SyncAdapter};

/// Whether a subscription may still deliver. The lock is held for the whole of a delivery.
type Gate = Arc<Mutex<bool>>;

/// Call `deliver` if the gate is still open. Returns whether it was called.
fn deliver_if_open(gate: &Gate, deliver: impl FnOnce()) -> bool {
    let open = match gate.lock() {
        Ok(open) => open,
        Err(poisoned) => poisoned.into_inner(),
    };

    if *open {
        deliver();
    }

    *open
}

/// A running subscription. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct Subscription {
    gate: Gate,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    fn new(gate: Gate, task: JoinHandle<()>) -> Self {
        Self {
            gate,
            task: Mutex::new(Some(task)),
        }
    }

    /// Stop delivering updates. Cancelling more than once has no further effect.
    ///
    /// An update that is being delivered on another thread finishes first, and nothing is
    /// delivered once this returns.
    pub fn cancel(&self) {
        match self.gate.lock() {
            Ok(mut open) => *open = false,
            Err(poisoned) => *poisoned.into_inner() = false,
        }

        let task = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(task) = task {
            task.abort();
        }
    }

    /// Whether the subscription is still delivering updates.
    ///
    /// A subscription stops on its own after reporting an error.
    pub fn is_active(&self) -> bool {
        let open = match self.gate.lock() {
            Ok(open) => *open,
            Err(_) => false,
        };

        open && match self.task.lock() {
            Ok(task) => task.as_ref().is_some_and(|task| !task.is_finished()),
            Err(_) => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Wait for a change that `is_relevant` accepts.
///
/// Falling behind the feed counts as a relevant change since the missed changes are unknown.
async fn next_relevant_change(
    changes: &mut broadcast::Receiver<Change>,
    is_relevant: impl Fn(&Change) -> bool,
) -> Result<(), Error> {
    loop {
        match changes.recv().await {
            Ok(change) if is_relevant(&change) => return Ok(()),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Subscription skipped {skipped} changes");
                return Ok(());
            }
            Err(RecvError::Closed) => return Err(Error::ChangeFeedClosed),
        }
    }
}

impl SyncAdapter {
    /// Call `on_update` with the family `family_id` now and after every change to it or its
    /// members.
    ///
    /// If the family does not exist nothing is delivered until it is created. On the first error
    /// `on_error` is called and the subscription stops.
    pub fn subscribe_family<U, E>(
        &self,
        family_id: FamilyId,
        mut on_update: U,
        on_error: E,
    ) -> Subscription
    where
        U: FnMut(Family) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        // Listen before the first read so no change between the two is missed.
        let mut changes = self.documents.changes();
        let adapter = self.clone();
        let gate: Gate = Arc::new(Mutex::new(true));
        let task_gate = gate.clone();

        let task = tokio::spawn(async move {
            tracing::debug!("Subscribed to family {family_id}");

            let error = loop {
                match adapter.get_family(&family_id).await {
                    Ok(Some(family)) => {
                        if !deliver_if_open(&task_gate, || on_update(family)) {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(error) => break error,
                }

                let is_relevant = |change: &Change| match change.collection {
                    Collection::Families => change.id == family_id.as_str(),
                    Collection::Users => true,
                    _ => false,
                };

                if let Err(error) = next_relevant_change(&mut changes, is_relevant).await {
                    break error;
                }
            };

            tracing::error!("Family subscription for {family_id} stopped: {error}");
            deliver_if_open(&task_gate, || on_error(error));
        });

        Subscription::new(gate, task)
    }

    /// Call `on_update` with the expenses of `family_id` now and after every change to the
    /// expenses collection.
    ///
    /// On the first error `on_error` is called and the subscription stops.
    pub fn subscribe_expenses<U, E>(
        &self,
        family_id: FamilyId,
        mut on_update: U,
        on_error: E,
    ) -> Subscription
    where
        U: FnMut(Vec<Expense>) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        let mut changes = self.documents.changes();
        let adapter = self.clone();
        let gate: Gate = Arc::new(Mutex::new(true));
        let task_gate = gate.clone();

        let task = tokio::spawn(async move {
            tracing::debug!("Subscribed to expenses of family {family_id}");

            let error = loop {
                match adapter.get_expenses(&family_id).await {
                    Ok(expenses) => {
                        if !deliver_if_open(&task_gate, || on_update(expenses)) {
                            return;
                        }
                    }
                    Err(error) => break error,
                }

                let is_relevant = |change: &Change| change.collection == Collection::Expenses;

                if let Err(error) = next_relevant_change(&mut changes, is_relevant).await {
                    break error;
                }
            };

            tracing::error!("Expense subscription for {family_id} stopped: {error}");
            deliver_if_open(&task_gate, || on_error(error));
        });

        Subscription::new(gate, task)
    }
}

#[cfg(test)]
mod subscription_tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use tokio::{
        sync::{broadcast, mpsc},
        time::timeout,
    };
    use time::UtcOffset;

    use crate::{
        Change, Collection, Document, DocumentStore, Error, ExpenseCategory, Fields, Filter,
        SyncAdapter, UserId,
        sync::test_utils::{create_test_family, draft, get_test_adapter, new_member},
    };

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn expenses_are_delivered_initially_and_after_writes() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let subscription = adapter.subscribe_expenses(
            family.id.clone(),
            move |expenses| {
                let _ = sender.send(expenses);
            },
            |error| panic!("unexpected subscription error: {error}"),
        );

        let initial = timeout(WAIT, receiver.recv()).await.unwrap().unwrap();
        assert!(initial.is_empty());

        adapter
            .create_expense(
                &draft("Bread", "3", ExpenseCategory::Food, "2024-03-01"),
                &UserId::new("alice"),
                &family.id,
            )
            .await
            .unwrap();

        let updated = timeout(WAIT, receiver.recv()).await.unwrap().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].title, "Bread");

        subscription.cancel();
    }

    #[tokio::test]
    async fn family_is_redelivered_when_members_change() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let _subscription = adapter.subscribe_family(
            family.id.clone(),
            move |family| {
                let _ = sender.send(family);
            },
            |error| panic!("unexpected subscription error: {error}"),
        );

        let initial = timeout(WAIT, receiver.recv()).await.unwrap().unwrap();
        assert_eq!(initial.members.len(), 1);

        adapter
            .join_existing_family(&family.id, &new_member("bob"))
            .await
            .unwrap();

        // Joining writes several documents, wait for the delivery that includes the new member.
        let joined = timeout(WAIT, async {
            loop {
                let family = receiver.recv().await.unwrap();
                if family.members.len() == 2 {
                    return family;
                }
            }
        })
        .await
        .unwrap();
        assert!(joined.member(&UserId::new("bob")).is_some());
    }

    #[tokio::test]
    async fn nothing_is_delivered_after_cancel() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let subscription = adapter.subscribe_expenses(
            family.id.clone(),
            move |expenses| {
                let _ = sender.send(expenses);
            },
            |_| {},
        );
        timeout(WAIT, receiver.recv()).await.unwrap().unwrap();

        subscription.cancel();
        subscription.cancel();
        assert!(!subscription.is_active());

        adapter
            .create_expense(
                &draft("Bread", "3", ExpenseCategory::Food, "2024-03-01"),
                &UserId::new("alice"),
                &family.id,
            )
            .await
            .unwrap();

        // The callback, and with it the sender, is dropped with the aborted task.
        assert_eq!(timeout(WAIT, receiver.recv()).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_waits_for_an_update_being_delivered() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let (started, started_receiver) = std::sync::mpsc::channel();
        let finished = Arc::new(AtomicBool::new(false));
        let finished_in_callback = finished.clone();

        let subscription = adapter.subscribe_expenses(
            family.id.clone(),
            move |_| {
                let _ = started.send(());
                std::thread::sleep(Duration::from_millis(200));
                finished_in_callback.store(true, Ordering::SeqCst);
            },
            |_| {},
        );
        started_receiver.recv_timeout(WAIT).unwrap();

        subscription.cancel();

        assert!(finished.load(Ordering::SeqCst));
        assert!(!subscription.is_active());
    }

    /// A store whose reads always fail.
    struct BrokenStore {
        changes: broadcast::Sender<Change>,
    }

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn get(&self, _: Collection, _: &str) -> Result<Option<Document>, Error> {
            Err(Error::DatabaseLockError)
        }

        async fn query(&self, _: Collection, _: &[Filter]) -> Result<Vec<Document>, Error> {
            Err(Error::DatabaseLockError)
        }

        async fn add(&self, _: Collection, _: Fields) -> Result<String, Error> {
            Err(Error::DatabaseLockError)
        }

        async fn set(&self, _: Collection, _: &str, _: Fields) -> Result<(), Error> {
            Err(Error::DatabaseLockError)
        }

        async fn update(&self, _: Collection, _: &str, _: Fields) -> Result<(), Error> {
            Err(Error::DatabaseLockError)
        }

        async fn delete(&self, _: Collection, _: &str) -> Result<(), Error> {
            Err(Error::DatabaseLockError)
        }

        fn changes(&self) -> broadcast::Receiver<Change> {
            self.changes.subscribe()
        }
    }

    #[tokio::test]
    async fn errors_are_reported_once_and_stop_the_subscription() {
        let (changes, _) = broadcast::channel(4);
        let adapter = SyncAdapter::new(Arc::new(BrokenStore { changes }), UtcOffset::UTC);
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let subscription = adapter.subscribe_family(
            crate::FamilyId::new("smiths"),
            |_| panic!("no family should be delivered"),
            move |error| {
                let _ = sender.send(error);
            },
        );

        let error = timeout(WAIT, receiver.recv()).await.unwrap();
        assert_eq!(error, Some(Error::DatabaseLockError));
        assert_eq!(timeout(WAIT, receiver.recv()).await.unwrap(), None);
        timeout(WAIT, async {
            while subscription.is_active() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscription should stop after an error");
    }
}
