//! Keeps the local store in sync with the remote store for a signed-in user.

use std::sync::{Arc, Mutex};

use crate::{
    Action, AppSnapshot, Error, Family, FamilyDraft, FamilyId, JoinCode, NewMember, Store,
    Subscription, SyncAdapter, User, UserId,
};

/// The subscriptions open for the current family.
struct WatchedFamily {
    family_id: FamilyId,
    // Held for their drop, which cancels them.
    _family: Subscription,
    _expenses: Subscription,
}

/// A signed-in user's connection between the [Store] and the remote store.
///
/// Signing in rehydrates the store and subscribes to the user's family and its expenses. The
/// subscriptions follow the current family and are cancelled on sign out.
pub struct Session {
    adapter: SyncAdapter,
    store: Store,
    watched: Mutex<Option<WatchedFamily>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl Session {
    /// Create a signed-out session.
    pub fn new(adapter: SyncAdapter, store: Store) -> Self {
        Self {
            adapter,
            store,
            watched: Mutex::new(None),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    /// The store this session keeps up to date.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The adapter used to talk to the remote store.
    pub fn adapter(&self) -> &SyncAdapter {
        &self.adapter
    }

    /// Load everything the user `user_id` can see into the store and start listening for changes.
    ///
    /// If the user has no user document the store is left empty.
    pub async fn sign_in(&self, user_id: &UserId) -> Result<(), Error> {
        tracing::info!("Signing in {user_id}");

        let snapshot = self.rehydrate(user_id).await?;
        let family_id = snapshot
            .current_family
            .as_ref()
            .map(|family| family.id.clone());

        self.store.dispatch(Action::Load(snapshot));
        self.watch_family(family_id);

        Ok(())
    }

    async fn rehydrate(&self, user_id: &UserId) -> Result<AppSnapshot, Error> {
        let Some(user) = self.adapter.get_user(user_id).await? else {
            tracing::warn!("No user document for {user_id}");
            return Ok(AppSnapshot::default());
        };

        let mut snapshot = AppSnapshot {
            current_user: Some(user.clone()),
            users: vec![user.clone()],
            ..Default::default()
        };

        let Some(family_id) = &user.family_id else {
            return Ok(snapshot);
        };

        let Some(family) = self.adapter.get_family(family_id).await? else {
            tracing::warn!("{user_id} belongs to family {family_id} which does not exist");
            return Ok(snapshot);
        };

        snapshot.expenses = self.adapter.get_expenses(family_id).await?;
        snapshot.users = family.members.clone();
        snapshot.families = vec![family.clone()];
        snapshot.current_family = Some(family);

        Ok(snapshot)
    }

    /// Subscribe to `family_id`, replacing the subscriptions of any other family.
    ///
    /// Does nothing if `family_id` is already being watched. `None` closes the subscriptions.
    pub fn watch_family(&self, family_id: Option<FamilyId>) {
        let mut watched = match self.watched.lock() {
            Ok(watched) => watched,
            Err(poisoned) => poisoned.into_inner(),
        };

        let current = watched.as_ref().map(|watched| &watched.family_id);
        if current == family_id.as_ref() {
            return;
        }

        // Cancel the old subscriptions before opening new ones.
        *watched = None;

        let Some(family_id) = family_id else {
            return;
        };

        tracing::debug!("Watching family {family_id}");
        *watched = Some(WatchedFamily {
            _family: self.subscribe_family(family_id.clone()),
            _expenses: self.subscribe_expenses(family_id.clone()),
            family_id,
        });
    }

    /// The family whose subscriptions are open.
    pub fn watched_family(&self) -> Option<FamilyId> {
        match self.watched.lock() {
            Ok(watched) => watched.as_ref().map(|watched| watched.family_id.clone()),
            Err(_) => None,
        }
    }

    fn subscribe_family(&self, family_id: FamilyId) -> Subscription {
        let store = self.store.clone();
        let last_error = self.last_error.clone();

        self.adapter.subscribe_family(
            family_id,
            move |family| {
                let current_user = store.snapshot().current_user.clone();

                store.dispatch(Action::ReplaceUsers(family.members.clone()));
                if let Some(me) = current_user.and_then(|user| family.member(&user.id).cloned()) {
                    store.dispatch(Action::EditUser(me));
                }
                store.dispatch(Action::AddFamily(family.clone()));
                store.dispatch(Action::SetCurrentFamily(Some(family)));
            },
            move |error| record_error(&last_error, "Family subscription error", error),
        )
    }

    fn subscribe_expenses(&self, family_id: FamilyId) -> Subscription {
        let store = self.store.clone();
        let last_error = self.last_error.clone();

        self.adapter.subscribe_expenses(
            family_id,
            move |expenses| store.dispatch(Action::ReplaceExpenses(expenses)),
            move |error| record_error(&last_error, "Expenses subscription error", error),
        )
    }

    fn current_user(&self) -> Result<User, Error> {
        self.store
            .snapshot()
            .current_user
            .clone()
            .ok_or(Error::NotFound)
    }

    fn current_member(&self) -> Result<NewMember, Error> {
        let user = self.current_user()?;

        Ok(NewMember {
            id: user.id,
            name: user.name,
            email: Some(user.email),
        })
    }

    /// Join the family using the code typed by the user. Surrounding whitespace and case are
    /// ignored.
    pub async fn join_family_by_code(&self, code: &str) -> Result<Family, Error> {
        let code = JoinCode::parse(code)?;
        let member = self.current_member()?;

        let family = self.adapter.join_family_by_code(&code, &member).await?;
        self.switch_family(&member.id, &family).await?;

        Ok(family)
    }

    /// Create a family owned by the signed-in user and switch to it.
    pub async fn create_family(&self, draft: FamilyDraft) -> Result<Family, Error> {
        let member = self.current_member()?;

        let family = self.adapter.create_family_with_member(draft, &member).await?;
        self.switch_family(&member.id, &family).await?;

        Ok(family)
    }

    /// Leave the current family.
    pub async fn leave_family(&self) -> Result<(), Error> {
        let user = self.current_user()?;
        let family = self
            .store
            .snapshot()
            .current_family
            .clone()
            .ok_or(Error::NotAMember)?;

        self.adapter.leave_family(&family, &user.id).await?;

        self.watch_family(None);
        if let Some(user) = self.adapter.get_user(&user.id).await? {
            self.store.dispatch(Action::EditUser(user));
        }
        self.store.dispatch(Action::SetCurrentFamily(None));
        self.store.dispatch(Action::ReplaceExpenses(Vec::new()));

        Ok(())
    }

    async fn switch_family(&self, user_id: &UserId, family: &Family) -> Result<(), Error> {
        if let Some(user) = self.adapter.get_user(user_id).await? {
            self.store.dispatch(Action::SetCurrentUser(Some(user)));
        }

        self.store.dispatch(Action::ReplaceUsers(family.members.clone()));
        self.store.dispatch(Action::AddFamily(family.clone()));
        self.store
            .dispatch(Action::SetCurrentFamily(Some(family.clone())));
        self.watch_family(Some(family.id.clone()));

        Ok(())
    }

    /// Record an export and return the store's contents as pretty printed JSON.
    pub async fn export(&self) -> Result<String, Error> {
        let snapshot = self.store.snapshot();
        let user = snapshot.current_user.as_ref().ok_or(Error::NotFound)?;
        let family_id = snapshot.current_family.as_ref().map(|family| &family.id);

        let export_id = self.adapter.record_export(&user.id, family_id).await?;
        tracing::info!("Recorded export {export_id} for {}", user.id);

        snapshot.to_json_pretty()
    }

    /// Close the subscriptions and clear the store.
    pub fn sign_out(&self) {
        tracing::info!("Signing out");

        self.watch_family(None);
        self.store.dispatch(Action::Load(AppSnapshot::default()));
    }

    /// The message of the last subscription error, if any.
    pub fn last_error(&self) -> Option<String> {
        match self.last_error.lock() {
            Ok(last_error) => last_error.clone(),
            Err(_) => None,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.watch_family(None);
    }
}

fn record_error(last_error: &Mutex<Option<String>>, context: &str, error: Error) {
    tracing::error!("{context}: {error}");

    if let Ok(mut last_error) = last_error.lock() {
        *last_error = Some(error.to_string());
    }
}
