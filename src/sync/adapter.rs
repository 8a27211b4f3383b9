//! Request/response operations between the local store's types and the remote document store.

use std::{cmp::Reverse, sync::Arc};

use serde_json::json;
use time::UtcOffset;

use crate::{
    Collection, Currency, Document, DocumentStore, Error, Expense, ExpenseDraft, ExpenseId,
    Family, FamilyDraft, FamilyId, Fields, FieldErrors, Filter, JoinCode, MemberForm, Timestamp,
    User, UserId, check_member_removal,
    family::check_leave,
    new_document_id,
    sync::schema::{
        ExpenseDocument, FamilyDocument, expense_from_document, family_from_document, parse,
        to_fields, user_from_document,
    },
};

/// The identity of a user joining or creating a family, as given by the auth provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    /// The auth provider's user ID.
    pub id: UserId,
    /// The user's display name.
    pub name: String,
    /// The user's email address, which the auth provider may not know.
    pub email: Option<String>,
}

impl NewMember {
    fn validate(&self) -> Result<(), Error> {
        let mut errors = FieldErrors::new();

        if self.id.as_str().trim().is_empty() {
            errors.insert("id", "User ID is required");
        }

        if self.name.trim().is_empty() {
            errors.insert("name", "Name is required");
        }

        if !errors.is_empty() {
            return Err(Error::InvalidForm(errors));
        }

        self.email().map(|_| ())
    }

    fn email(&self) -> Result<&str, Error> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(Error::EmailRequired)
    }
}

/// Changes to a user's profile. Fields left as `None` are not changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    /// The new display name.
    pub name: Option<String>,
    /// The new avatar URL, an empty string clears it.
    pub avatar: Option<String>,
    /// The new preferred currency.
    pub currency: Option<Currency>,
}

/// Changes to a family's settings. Fields left as `None` are not changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FamilyUpdate {
    /// The new family name.
    pub name: Option<String>,
    /// The new default currency.
    pub default_currency: Option<Currency>,
}

/// Translates between domain types and remote documents.
///
/// Timestamps read from the remote store are converted to `offset`, the viewer's UTC offset.
#[derive(Clone)]
pub struct SyncAdapter {
    pub(crate) documents: Arc<dyn DocumentStore>,
    pub(crate) offset: UtcOffset,
}

impl SyncAdapter {
    /// Create an adapter over `documents` for a viewer at `offset`.
    pub fn new(documents: Arc<dyn DocumentStore>, offset: UtcOffset) -> Self {
        Self { documents, offset }
    }

    /// The viewer's UTC offset.
    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// Get a user by ID, `None` if they have no user document.
    ///
    /// # Errors
    /// Returns [Error::InvalidDocument] if the user document is malformed, or a store error.
    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        self.find_user_document(user_id)
            .await?
            .map(|document| user_from_document(&document, self.offset))
            .transpose()
    }

    /// Get a family and its members, `None` if the family does not exist.
    ///
    /// # Errors
    /// Returns [Error::InvalidDocument] if the family document is malformed, or a store error.
    pub async fn get_family(&self, family_id: &FamilyId) -> Result<Option<Family>, Error> {
        let Some(document) = self
            .documents
            .get(Collection::Families, family_id.as_str())
            .await?
        else {
            return Ok(None);
        };

        let members = self.get_family_members(family_id).await?;

        family_from_document(&document, members, self.offset).map(Some)
    }

    /// Get the users whose documents point at `family_id`, skipping malformed documents.
    pub async fn get_family_members(&self, family_id: &FamilyId) -> Result<Vec<User>, Error> {
        let documents = self
            .documents
            .query(
                Collection::Users,
                &[Filter::eq("familyId", family_id.as_str())],
            )
            .await?;

        Ok(documents
            .iter()
            .filter_map(|document| {
                user_from_document(document, self.offset)
                    .inspect_err(|error| tracing::warn!("Skipping user: {error}"))
                    .ok()
            })
            .collect())
    }

    /// Get a family's expenses, most recent first with unknown dates last.
    ///
    /// Malformed expense documents are skipped.
    pub async fn get_expenses(&self, family_id: &FamilyId) -> Result<Vec<Expense>, Error> {
        let documents = self
            .documents
            .query(
                Collection::Expenses,
                &[Filter::eq("familyId", family_id.as_str())],
            )
            .await?;

        let mut expenses: Vec<Expense> = documents
            .iter()
            .filter_map(|document| {
                expense_from_document(document, self.offset)
                    .inspect_err(|error| tracing::warn!("Skipping expense: {error}"))
                    .ok()
            })
            .collect();

        expenses.sort_by_key(|expense| match expense.date {
            Timestamp::Known(date) => (false, Reverse(Some(date))),
            Timestamp::Unknown => (true, Reverse(None)),
        });

        Ok(expenses)
    }

    /// Get a single expense by ID.
    pub async fn get_expense(&self, expense_id: &ExpenseId) -> Result<Option<Expense>, Error> {
        self.documents
            .get(Collection::Expenses, expense_id.as_str())
            .await?
            .map(|document| expense_from_document(&document, self.offset))
            .transpose()
    }

    /// Record a new expense spent by `user_id` in `family_id`.
    pub async fn create_expense(
        &self,
        draft: &ExpenseDraft,
        user_id: &UserId,
        family_id: &FamilyId,
    ) -> Result<Expense, Error> {
        let now = Timestamp::now();
        let fields = expense_fields(draft, user_id, family_id, now, now, self.offset)?;

        let id = self.documents.add(Collection::Expenses, fields).await?;
        tracing::debug!("Created expense {id} in family {family_id}");

        self.get_expense(&ExpenseId::new(&id))
            .await?
            .ok_or(Error::NotFound)
    }

    /// Replace the editable fields of an existing expense with `draft`.
    ///
    /// The whole document is rewritten, keeping the original owner and creation time.
    ///
    /// # Errors
    /// Returns [Error::UpdateMissingExpense] if the expense does not exist.
    pub async fn update_expense(
        &self,
        expense_id: &ExpenseId,
        draft: &ExpenseDraft,
    ) -> Result<Expense, Error> {
        let existing = self
            .get_expense(expense_id)
            .await?
            .ok_or(Error::UpdateMissingExpense)?;

        let fields = expense_fields(
            draft,
            &existing.user_id,
            &existing.family_id,
            existing.created_at,
            Timestamp::now(),
            self.offset,
        )?;

        self.documents
            .set(Collection::Expenses, expense_id.as_str(), fields)
            .await?;

        self.get_expense(expense_id)
            .await?
            .ok_or(Error::UpdateMissingExpense)
    }

    /// Delete an expense.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingExpense] if the expense does not exist.
    pub async fn delete_expense(&self, expense_id: &ExpenseId) -> Result<(), Error> {
        match self
            .documents
            .delete(Collection::Expenses, expense_id.as_str())
            .await
        {
            Err(Error::NotFound) => Err(Error::DeleteMissingExpense),
            result => result,
        }
    }

    /// Change a user's profile.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the user has no document, or [Error::InvalidForm] if the new
    /// name is blank.
    pub async fn update_user(&self, user_id: &UserId, update: UserUpdate) -> Result<User, Error> {
        let mut fields = Fields::new();

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                let mut errors = FieldErrors::new();
                errors.insert("name", "Name is required");
                return Err(Error::InvalidForm(errors));
            }
            fields.insert("name".to_owned(), json!(name));
        }

        if let Some(avatar) = update.avatar {
            fields.insert("avatar".to_owned(), json!(avatar.trim()));
        }

        if let Some(currency) = update.currency {
            fields.insert("currency".to_owned(), serde_json::to_value(currency)?);
        }

        let document = self
            .find_user_document(user_id)
            .await?
            .ok_or(Error::NotFound)?;

        fields.insert("updatedAt".to_owned(), Timestamp::now().to_remote());
        self.documents
            .update(Collection::Users, &document.id, fields)
            .await?;

        self.get_user(user_id).await?.ok_or(Error::NotFound)
    }

    /// Create a family owned by `owner`, who becomes its first admin member.
    pub async fn create_family_with_member(
        &self,
        draft: FamilyDraft,
        owner: &NewMember,
    ) -> Result<Family, Error> {
        let draft = draft.validate()?;
        owner.validate()?;

        let now = Timestamp::now().to_remote();
        let document = FamilyDocument {
            name: draft.name,
            owner_id: owner.id.to_string(),
            member_ids: vec![owner.id.to_string()],
            default_currency: draft.default_currency,
            join_code: JoinCode::generate().to_string(),
            created_at: now.clone(),
            updated_at: now,
        };

        let id = self
            .documents
            .add(Collection::Families, to_fields(&document)?)
            .await?;
        let family_id = FamilyId::new(&id);
        tracing::info!("Created family {family_id} owned by {}", owner.id);

        self.create_user_in_family(owner, &family_id, true, draft.default_currency)
            .await?;

        self.get_family(&family_id).await?.ok_or(Error::NotFound)
    }

    /// Join the family that uses `code`.
    ///
    /// # Errors
    /// Returns [Error::JoinCodeNotFound] if no family uses the code.
    pub async fn join_family_by_code(
        &self,
        code: &JoinCode,
        user: &NewMember,
    ) -> Result<Family, Error> {
        user.validate()?;

        let documents = self
            .documents
            .query(Collection::Families, &[Filter::eq("joinCode", code.as_ref())])
            .await?;

        let Some(document) = documents.into_iter().next() else {
            return Err(Error::JoinCodeNotFound);
        };

        self.join(document, user).await
    }

    /// Join the family with the ID `family_id`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the family does not exist.
    pub async fn join_existing_family(
        &self,
        family_id: &FamilyId,
        user: &NewMember,
    ) -> Result<Family, Error> {
        user.validate()?;

        let document = self
            .documents
            .get(Collection::Families, family_id.as_str())
            .await?
            .ok_or(Error::NotFound)?;

        self.join(document, user).await
    }

    async fn join(&self, document: Document, user: &NewMember) -> Result<Family, Error> {
        let family: FamilyDocument = parse(Collection::Families, &document)?;
        let family_id = FamilyId::new(&document.id);
        let email = user.email()?;

        // A member added by an admin under this email is replaced by the joining user.
        let members = self.get_family_members(&family_id).await?;
        let placeholder = members
            .iter()
            .find(|member| member.has_email(email) && member.id != user.id);
        let is_admin = placeholder.is_some_and(|member| member.is_admin);
        if let Some(placeholder) = placeholder {
            if let Some(document) = self.find_user_document(&placeholder.id).await? {
                self.documents.delete(Collection::Users, &document.id).await?;
            }
        }

        let mut member_ids: Vec<String> = family
            .member_ids
            .into_iter()
            .filter(|id| placeholder.is_none_or(|member| member.id.as_str() != id.as_str()))
            .collect();
        if !member_ids.iter().any(|id| id == user.id.as_str()) {
            member_ids.push(user.id.to_string());
        }
        self.set_member_ids(&family_id, member_ids).await?;

        self.create_user_in_family(user, &family_id, is_admin, family.default_currency)
            .await?;
        tracing::info!("User {} joined family {family_id}", user.id);

        self.get_family(&family_id).await?.ok_or(Error::NotFound)
    }

    /// Write the user document for a member of `family_id`.
    ///
    /// If a user document with the same email (ignoring case) exists it is claimed by the
    /// member's ID and moved to the family, otherwise a document is created under the member's
    /// ID.
    ///
    /// # Errors
    /// Returns [Error::EmailRequired] if the member has no email address.
    pub async fn create_user_in_family(
        &self,
        member: &NewMember,
        family_id: &FamilyId,
        is_admin: bool,
        currency: Currency,
    ) -> Result<User, Error> {
        let email = member.email()?;

        let mut fields =
            member_fields(&member.id, member.name.trim(), email, is_admin, family_id, currency)?;

        match self.find_user_document_by_email(email).await? {
            Some((document, _)) => {
                self.documents
                    .update(Collection::Users, &document.id, fields)
                    .await?;
            }
            None => {
                fields.insert("createdAt".to_owned(), Timestamp::now().to_remote());
                self.documents
                    .set(Collection::Users, member.id.as_str(), fields)
                    .await?;
            }
        }

        self.get_user(&member.id).await?.ok_or(Error::NotFound)
    }

    /// Add a member to `family` on behalf of `actor`, who must be an admin.
    ///
    /// A user without a family who already has a document under the email is attached with
    /// their existing ID. Otherwise the new member gets a generated user ID until they sign in
    /// with the same email.
    ///
    /// # Errors
    /// Returns [Error::InvalidForm] if the email belongs to a member of another family.
    pub async fn add_member(
        &self,
        family: &Family,
        actor: &User,
        form: &MemberForm,
    ) -> Result<User, Error> {
        let is_admin = family
            .member(&actor.id)
            .is_some_and(|member| member.is_admin);
        if !is_admin {
            return Err(Error::NotAdmin);
        }

        let form = form.validate(&family.members)?;

        let user_id = match self.find_user_document_by_email(&form.email).await? {
            Some((_, user)) if user.family_id.as_ref().is_some_and(|id| id != &family.id) => {
                let mut errors = FieldErrors::new();
                errors.insert("email", "This email belongs to a member of another family");
                return Err(Error::InvalidForm(errors));
            }
            Some((document, user)) => {
                let mut fields = Fields::new();
                fields.insert("familyId".to_owned(), json!(family.id.as_str()));
                fields.insert("isAdmin".to_owned(), json!(form.is_admin));
                fields.insert("updatedAt".to_owned(), Timestamp::now().to_remote());
                self.documents
                    .update(Collection::Users, &document.id, fields)
                    .await?;

                user.id
            }
            None => {
                let user_id = UserId::new(&new_document_id());
                let mut fields = member_fields(
                    &user_id,
                    &form.name,
                    &form.email,
                    form.is_admin,
                    &family.id,
                    family.default_currency,
                )?;
                fields.insert("createdAt".to_owned(), Timestamp::now().to_remote());
                self.documents
                    .set(Collection::Users, user_id.as_str(), fields)
                    .await?;

                user_id
            }
        };

        let mut member_ids: Vec<String> = family
            .members
            .iter()
            .map(|member| member.id.to_string())
            .collect();
        member_ids.push(user_id.to_string());
        self.set_member_ids(&family.id, member_ids).await?;

        let user = self.get_user(&user_id).await?.ok_or(Error::NotFound)?;
        tracing::info!("{} added {} to family {}", actor.id, user.id, family.id);

        Ok(user)
    }

    /// Remove `member_id` from `family` on behalf of `actor`.
    ///
    /// The member's user document is kept, detached from the family.
    ///
    /// # Errors
    /// See [check_member_removal].
    pub async fn remove_member(
        &self,
        family: &Family,
        actor: &User,
        member_id: &UserId,
    ) -> Result<(), Error> {
        check_member_removal(family, actor, member_id)?;

        self.detach(family, member_id).await?;
        tracing::info!("{} removed {member_id} from family {}", actor.id, family.id);

        Ok(())
    }

    /// Leave `family`.
    ///
    /// # Errors
    /// Returns [Error::OwnerCannotLeave] if `user_id` owns the family, or [Error::NotAMember].
    pub async fn leave_family(&self, family: &Family, user_id: &UserId) -> Result<(), Error> {
        check_leave(family, user_id)?;

        self.detach(family, user_id).await?;
        tracing::info!("{user_id} left family {}", family.id);

        Ok(())
    }

    async fn detach(&self, family: &Family, user_id: &UserId) -> Result<(), Error> {
        let document = self
            .find_user_document(user_id)
            .await?
            .ok_or(Error::NotAMember)?;

        let mut fields = Fields::new();
        fields.insert("familyId".to_owned(), json!(""));
        fields.insert("isAdmin".to_owned(), json!(false));
        fields.insert("updatedAt".to_owned(), Timestamp::now().to_remote());
        self.documents
            .update(Collection::Users, &document.id, fields)
            .await?;

        let member_ids = family
            .members
            .iter()
            .filter(|member| &member.id != user_id)
            .map(|member| member.id.to_string())
            .collect();

        self.set_member_ids(&family.id, member_ids).await
    }

    /// Change a family's settings on behalf of `actor`, who must be an admin of the family.
    pub async fn update_family(
        &self,
        family_id: &FamilyId,
        actor: &User,
        update: FamilyUpdate,
    ) -> Result<Family, Error> {
        if !actor.is_admin || actor.family_id.as_ref() != Some(family_id) {
            return Err(Error::NotAdmin);
        }

        let mut fields = Fields::new();

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                let mut errors = FieldErrors::new();
                errors.insert("name", "Family name is required");
                return Err(Error::InvalidForm(errors));
            }
            fields.insert("name".to_owned(), json!(name));
        }

        if let Some(currency) = update.default_currency {
            fields.insert("defaultCurrency".to_owned(), serde_json::to_value(currency)?);
        }

        fields.insert("updatedAt".to_owned(), Timestamp::now().to_remote());
        self.documents
            .update(Collection::Families, family_id.as_str(), fields)
            .await?;

        self.get_family(family_id).await?.ok_or(Error::NotFound)
    }

    /// Note that `user_id` exported their data, returning the ID of the export record.
    pub async fn record_export(
        &self,
        user_id: &UserId,
        family_id: Option<&FamilyId>,
    ) -> Result<String, Error> {
        let mut fields = Fields::new();
        fields.insert("userId".to_owned(), json!(user_id.as_str()));
        fields.insert(
            "familyId".to_owned(),
            json!(family_id.map(FamilyId::as_str).unwrap_or_default()),
        );
        fields.insert("exportedAt".to_owned(), Timestamp::now().to_remote());

        self.documents.add(Collection::Exports, fields).await
    }

    /// User documents are looked up by their `id` field, falling back to the document ID.
    async fn find_user_document(&self, user_id: &UserId) -> Result<Option<Document>, Error> {
        let documents = self
            .documents
            .query(Collection::Users, &[Filter::eq("id", user_id.as_str())])
            .await?;

        match documents.into_iter().next() {
            Some(document) => Ok(Some(document)),
            None => self.documents.get(Collection::Users, user_id.as_str()).await,
        }
    }

    /// The first readable user document whose email matches `email`, ignoring case.
    async fn find_user_document_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(Document, User)>, Error> {
        let documents = self.documents.query(Collection::Users, &[]).await?;

        Ok(documents.into_iter().find_map(|document| {
            match user_from_document(&document, self.offset) {
                Ok(user) if user.has_email(email) => Some((document, user)),
                Ok(_) => None,
                Err(error) => {
                    tracing::warn!("Skipping user document while matching email: {error}");
                    None
                }
            }
        }))
    }

    async fn set_member_ids(
        &self,
        family_id: &FamilyId,
        member_ids: Vec<String>,
    ) -> Result<(), Error> {
        let mut fields = Fields::new();
        fields.insert("memberIds".to_owned(), json!(member_ids));
        fields.insert("updatedAt".to_owned(), Timestamp::now().to_remote());

        self.documents
            .update(Collection::Families, family_id.as_str(), fields)
            .await
    }
}

fn member_fields(
    user_id: &UserId,
    name: &str,
    email: &str,
    is_admin: bool,
    family_id: &FamilyId,
    currency: Currency,
) -> Result<Fields, Error> {
    let mut fields = Fields::new();
    fields.insert("id".to_owned(), json!(user_id.as_str()));
    fields.insert("name".to_owned(), json!(name));
    fields.insert("email".to_owned(), json!(email));
    fields.insert("isAdmin".to_owned(), json!(is_admin));
    fields.insert("familyId".to_owned(), json!(family_id.as_str()));
    fields.insert("currency".to_owned(), serde_json::to_value(currency)?);
    fields.insert("updatedAt".to_owned(), Timestamp::now().to_remote());

    Ok(fields)
}

fn expense_fields(
    draft: &ExpenseDraft,
    user_id: &UserId,
    family_id: &FamilyId,
    created_at: Timestamp,
    updated_at: Timestamp,
    offset: UtcOffset,
) -> Result<Fields, Error> {
    to_fields(&ExpenseDocument {
        title: draft.title.clone(),
        amount: draft.amount,
        location: draft.location.clone(),
        date: Timestamp::from_date(draft.date, offset).to_remote(),
        category: draft.category,
        notes: draft.notes.clone(),
        user_id: user_id.to_string(),
        family_id: family_id.to_string(),
        created_at: created_at.to_remote(),
        updated_at: updated_at.to_remote(),
    })
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;

    use rusqlite::Connection;
    use time::UtcOffset;

    use crate::{
        Currency, ExpenseCategory, ExpenseDraft, ExpenseForm, Family, FamilyDraft, NewMember,
        SqliteDocumentStore, SyncAdapter, UserId,
    };

    pub fn get_test_adapter() -> SyncAdapter {
        let connection = Connection::open_in_memory().unwrap();
        let store = SqliteDocumentStore::new(connection).expect("Could not create document store");

        SyncAdapter::new(Arc::new(store), UtcOffset::UTC)
    }

    pub fn new_member(id: &str) -> NewMember {
        NewMember {
            id: UserId::new(id),
            name: id.to_owned(),
            email: Some(format!("{id}@example.com")),
        }
    }

    pub fn draft(title: &str, amount: &str, category: ExpenseCategory, date: &str) -> ExpenseDraft {
        ExpenseForm {
            title: title.to_owned(),
            amount: amount.to_owned(),
            location: "Town".to_owned(),
            date: date.to_owned(),
            category,
            notes: String::new(),
        }
        .validate(UtcOffset::UTC)
        .expect("test draft should be valid")
    }

    pub async fn create_test_family(adapter: &SyncAdapter, owner: &str) -> Family {
        adapter
            .create_family_with_member(
                FamilyDraft {
                    name: "The Smiths".to_owned(),
                    default_currency: Currency::GBP,
                },
                &new_member(owner),
            )
            .await
            .expect("Could not create family")
    }
}


#[cfg(test)]
mod family_sync_tests {
    use serde_json::json;

    use crate::{
        Collection, Currency, Error, FamilyDraft, FamilyUpdate, Fields, JoinCode, MemberForm,
        UserId, UserUpdate,
    };

    use super::test_utils::{create_test_family, get_test_adapter, new_member};

    #[tokio::test]
    async fn creating_a_family_makes_owner_an_admin_member() {
        let adapter = get_test_adapter();

        let family = create_test_family(&adapter, "alice").await;

        assert_eq!(family.owner_id, UserId::new("alice"));
        assert_eq!(family.default_currency, Currency::GBP);
        assert_eq!(family.join_code.as_ref().len(), JoinCode::LENGTH);
        assert_eq!(family.members.len(), 1);
        assert!(family.members[0].is_admin);
        assert_eq!(family.members[0].currency, Currency::GBP);
        assert_eq!(family.members[0].family_id, Some(family.id.clone()));
    }

    #[tokio::test]
    async fn creating_a_family_requires_a_name_and_email() {
        let adapter = get_test_adapter();

        let blank_name = adapter
            .create_family_with_member(
                FamilyDraft {
                    name: " ".to_owned(),
                    default_currency: Currency::USD,
                },
                &new_member("alice"),
            )
            .await;
        assert!(matches!(blank_name, Err(Error::InvalidForm(_))));

        let mut no_email = new_member("alice");
        no_email.email = None;
        let no_email = adapter
            .create_family_with_member(
                FamilyDraft {
                    name: "Smiths".to_owned(),
                    default_currency: Currency::USD,
                },
                &no_email,
            )
            .await;
        assert_eq!(no_email, Err(Error::EmailRequired));
    }

    #[tokio::test]
    async fn join_by_code_ignores_case_and_adds_non_admin_member() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let code = JoinCode::parse(&family.join_code.as_ref().to_lowercase()).unwrap();

        let joined = adapter
            .join_family_by_code(&code, &new_member("bob"))
            .await
            .unwrap();

        assert_eq!(joined.id, family.id);
        assert_eq!(joined.members.len(), 2);
        let bob = joined.member(&UserId::new("bob")).unwrap();
        assert!(!bob.is_admin);
        assert_eq!(bob.currency, Currency::GBP);
    }

    #[tokio::test]
    async fn join_by_unknown_code_fails() {
        let adapter = get_test_adapter();

        let got = adapter
            .join_family_by_code(&JoinCode::new_unchecked("ZZZZ9999"), &new_member("bob"))
            .await;

        assert_eq!(got, Err(Error::JoinCodeNotFound));
    }

    #[tokio::test]
    async fn join_existing_family_by_id() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;

        let joined = adapter
            .join_existing_family(&family.id, &new_member("bob"))
            .await
            .unwrap();

        assert!(joined.member(&UserId::new("bob")).is_some());
    }

    #[tokio::test]
    async fn member_added_by_admin_is_claimed_on_sign_up() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let alice = adapter.get_user(&UserId::new("alice")).await.unwrap().unwrap();
        let form = MemberForm {
            name: "Bob".to_owned(),
            email: "bob@example.com".to_owned(),
            is_admin: false,
        };
        adapter.add_member(&family, &alice, &form).await.unwrap();

        // Bob later joins with the same email under his real ID.
        let joined = adapter
            .join_existing_family(&family.id, &new_member("bob"))
            .await
            .unwrap();

        assert_eq!(joined.members.len(), 2);
        assert!(joined.member(&UserId::new("bob")).is_some());
    }

    #[tokio::test]
    async fn joining_with_differently_cased_email_claims_added_member() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let alice = adapter.get_user(&UserId::new("alice")).await.unwrap().unwrap();
        let form = MemberForm {
            name: "Bob".to_owned(),
            email: "bob@example.com".to_owned(),
            is_admin: true,
        };
        adapter.add_member(&family, &alice, &form).await.unwrap();

        let mut bob = new_member("bob");
        bob.email = Some("Bob@Example.com".to_owned());
        let joined = adapter.join_existing_family(&family.id, &bob).await.unwrap();

        assert_eq!(joined.members.len(), 2);
        let bob = joined.member(&UserId::new("bob")).unwrap();
        assert!(bob.is_admin, "claiming keeps the role the admin gave");
        let bob_emails = joined
            .members
            .iter()
            .filter(|member| member.has_email("bob@example.com"))
            .count();
        assert_eq!(bob_emails, 1);
    }

    #[tokio::test]
    async fn joining_replaces_added_member_when_user_already_has_a_document() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let alice = adapter.get_user(&UserId::new("alice")).await.unwrap().unwrap();
        let form = MemberForm {
            name: "Bob".to_owned(),
            email: "bob@example.com".to_owned(),
            is_admin: false,
        };
        let added = adapter.add_member(&family, &alice, &form).await.unwrap();
        let mut fields = Fields::new();
        fields.insert("id".to_owned(), json!("bob"));
        fields.insert("name".to_owned(), json!("Bob"));
        fields.insert("email".to_owned(), json!("bob@example.com"));
        fields.insert("familyId".to_owned(), json!(""));
        adapter
            .documents
            .set(Collection::Users, "bob", fields)
            .await
            .unwrap();

        let joined = adapter
            .join_existing_family(&family.id, &new_member("bob"))
            .await
            .unwrap();

        assert_eq!(joined.members.len(), 2);
        assert!(joined.member(&UserId::new("bob")).is_some());
        assert!(joined.member(&added.id).is_none());
        assert_eq!(adapter.get_user(&added.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_member_rejects_member_of_another_family() {
        let adapter = get_test_adapter();
        let smiths = create_test_family(&adapter, "alice").await;
        let joneses = create_test_family(&adapter, "bob").await;
        let bob = adapter.get_user(&UserId::new("bob")).await.unwrap().unwrap();
        let form = MemberForm {
            name: "Alice".to_owned(),
            email: "ALICE@example.com".to_owned(),
            is_admin: false,
        };

        let got = adapter.add_member(&joneses, &bob, &form).await;

        match got {
            Err(Error::InvalidForm(errors)) => assert_eq!(
                errors.get("email"),
                Some("This email belongs to a member of another family")
            ),
            other => panic!("want a form error, got {other:?}"),
        }
        let smiths = adapter.get_family(&smiths.id).await.unwrap().unwrap();
        assert_eq!(smiths.members.len(), 1);
        let alice = adapter.get_user(&UserId::new("alice")).await.unwrap().unwrap();
        assert_eq!(alice.family_id, Some(smiths.id));
        let joneses = adapter.get_family(&joneses.id).await.unwrap().unwrap();
        assert_eq!(joneses.members.len(), 1);
    }

    #[tokio::test]
    async fn add_member_attaches_user_without_family_under_their_id() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let family = adapter
            .join_existing_family(&family.id, &new_member("bob"))
            .await
            .unwrap();
        let alice = family.member(&UserId::new("alice")).unwrap().clone();
        adapter
            .remove_member(&family, &alice, &UserId::new("bob"))
            .await
            .unwrap();
        let family = adapter.get_family(&family.id).await.unwrap().unwrap();
        let form = MemberForm {
            name: "Bob".to_owned(),
            email: "bob@example.com".to_owned(),
            is_admin: false,
        };

        let added = adapter.add_member(&family, &alice, &form).await.unwrap();

        assert_eq!(added.id, UserId::new("bob"));
        assert_eq!(added.family_id, Some(family.id.clone()));
        let family = adapter.get_family(&family.id).await.unwrap().unwrap();
        assert_eq!(family.members.len(), 2);
    }

    #[tokio::test]
    async fn add_member_rejects_duplicate_email_and_non_admins() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let alice = adapter.get_user(&UserId::new("alice")).await.unwrap().unwrap();
        let duplicate = MemberForm {
            name: "Alice again".to_owned(),
            email: "ALICE@example.com".to_owned(),
            is_admin: false,
        };

        assert!(matches!(
            adapter.add_member(&family, &alice, &duplicate).await,
            Err(Error::InvalidForm(_))
        ));

        let family = adapter
            .join_existing_family(&family.id, &new_member("bob"))
            .await
            .unwrap();
        let bob = adapter.get_user(&UserId::new("bob")).await.unwrap().unwrap();
        let form = MemberForm {
            name: "Carol".to_owned(),
            email: "carol@example.com".to_owned(),
            is_admin: false,
        };
        assert_eq!(
            adapter.add_member(&family, &bob, &form).await,
            Err(Error::NotAdmin)
        );
    }

    #[tokio::test]
    async fn removed_member_is_detached() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let family = adapter
            .join_existing_family(&family.id, &new_member("bob"))
            .await
            .unwrap();
        let alice = family.member(&UserId::new("alice")).unwrap().clone();

        adapter
            .remove_member(&family, &alice, &UserId::new("bob"))
            .await
            .unwrap();

        let family = adapter.get_family(&family.id).await.unwrap().unwrap();
        assert_eq!(family.members.len(), 1);
        let bob = adapter.get_user(&UserId::new("bob")).await.unwrap().unwrap();
        assert_eq!(bob.family_id, None);
    }

    #[tokio::test]
    async fn guardrails_reject_removing_last_member_self_and_owner() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let alice = family.member(&UserId::new("alice")).unwrap().clone();

        assert_eq!(
            adapter
                .remove_member(&family, &alice, &UserId::new("alice"))
                .await,
            Err(Error::CannotRemoveLastMember)
        );

        let family = adapter
            .join_existing_family(&family.id, &new_member("bob"))
            .await
            .unwrap();
        assert_eq!(
            adapter
                .remove_member(&family, &alice, &UserId::new("alice"))
                .await,
            Err(Error::CannotRemoveSelf)
        );
    }

    #[tokio::test]
    async fn members_can_leave_but_owner_cannot() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let family = adapter
            .join_existing_family(&family.id, &new_member("bob"))
            .await
            .unwrap();

        assert_eq!(
            adapter.leave_family(&family, &UserId::new("alice")).await,
            Err(Error::OwnerCannotLeave)
        );

        adapter
            .leave_family(&family, &UserId::new("bob"))
            .await
            .unwrap();

        let family = adapter.get_family(&family.id).await.unwrap().unwrap();
        assert!(family.member(&UserId::new("bob")).is_none());
    }

    #[tokio::test]
    async fn admin_can_rename_family() {
        let adapter = get_test_adapter();
        let family = create_test_family(&adapter, "alice").await;
        let alice = adapter.get_user(&UserId::new("alice")).await.unwrap().unwrap();

        let renamed = adapter
            .update_family(
                &family.id,
                &alice,
                FamilyUpdate {
                    name: Some(" Smith-Jones ".to_owned()),
                    default_currency: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(renamed.name, "Smith-Jones");
        assert_eq!(renamed.join_code, family.join_code);
    }

    #[tokio::test]
    async fn update_user_changes_profile() {
        let adapter = get_test_adapter();
        create_test_family(&adapter, "alice").await;

        let updated = adapter
            .update_user(
                &UserId::new("alice"),
                UserUpdate {
                    name: Some("Alicia".to_owned()),
                    avatar: None,
                    currency: Some(Currency::JPY),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Alicia");
        assert_eq!(updated.currency, Currency::JPY);
        assert!(updated.family_id.is_some());
    }

    #[tokio::test]
    async fn update_missing_user_fails() {
        let adapter = get_test_adapter();

        assert_eq!(
            adapter
                .update_user(&UserId::new("nobody"), UserUpdate::default())
                .await,
            Err(Error::NotFound)
        );
    }

    #[tokio::test]
    async fn export_is_recorded() {
        let adapter = get_test_adapter();

        let id = adapter
            .record_export(&UserId::new("alice"), None)
            .await
            .unwrap();

        assert!(!id.is_empty());
    }
}
