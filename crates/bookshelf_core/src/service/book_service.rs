//! Book use-case service.
//!
//! # Responsibility
//! - Provide the list/show/create/update/destroy entry points an outer web
//!   or CLI layer calls.
//! - Run every write through the book change set before persistence.
//!
//! # Invariants
//! - Create and update never persist input that failed validation.
//! - Every backend call carries the adapter's per-call deadline.

use crate::adapter::{MetadataAdapter, Persister, QueryService};
use crate::change_set::book::BOOK_CHANGE_SET;
use crate::change_set::input::FieldMap;
use crate::change_set::rules::ValidationErrors;
use crate::change_set::ChangeSet;
use crate::error::AdapterResult;
use crate::model::book::{new_book, BOOK};
use crate::model::identifier::Identifier;
use crate::model::resource::Resource;
use log::info;

/// Outcome of a create/update submission.
///
/// Callers branch on exactly these two shapes.
#[derive(Debug)]
pub enum Submission {
    /// Input passed validation and the stored book is returned.
    Persisted(Resource),
    /// Input failed validation; nothing was written.
    Invalid(ValidationErrors),
}

impl Submission {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted(_))
    }
}

/// Book service facade over one metadata adapter.
pub struct BookService<'a, P, Q> {
    adapter: &'a MetadataAdapter<P, Q>,
}

impl<'a, P: Persister, Q: QueryService> BookService<'a, P, Q> {
    pub fn new(adapter: &'a MetadataAdapter<P, Q>) -> Self {
        Self { adapter }
    }

    /// Lists all books in backend order.
    pub fn index(&self) -> AdapterResult<Vec<Resource>> {
        self.adapter
            .query_service()
            .find_all_of_model_within(&BOOK, self.adapter.deadline())
    }

    pub fn count(&self) -> AdapterResult<usize> {
        self.adapter
            .query_service()
            .count_all_of_model_within(&BOOK, self.adapter.deadline())
    }

    pub fn show(&self, id: &Identifier) -> AdapterResult<Resource> {
        self.adapter
            .query_service()
            .find_by_id_within(id, self.adapter.deadline())
    }

    /// Change set bound to a fresh, unpersisted book (the empty form).
    pub fn new_change_set(&self) -> AdapterResult<ChangeSet<'static>> {
        ChangeSet::new(&BOOK_CHANGE_SET, new_book())
    }

    /// Change set bound to a stored book (the edit form).
    pub fn edit_change_set(&self, id: &Identifier) -> AdapterResult<ChangeSet<'static>> {
        ChangeSet::new(&BOOK_CHANGE_SET, self.show(id)?)
    }

    /// Validates `input`, then syncs and persists a new book.
    pub fn create(&self, input: &FieldMap) -> AdapterResult<Submission> {
        let change_set = self.new_change_set()?;
        let submission = self.submit(change_set, input)?;
        log_submission("book_create", &submission);
        Ok(submission)
    }

    /// Validates `input` against the stored book, then overwrites it.
    ///
    /// Presence is checked against `input`, so `title` and `author` must be
    /// resubmitted on every update. Other permitted attributes absent from
    /// `input` keep their stored values.
    pub fn update(&self, id: &Identifier, input: &FieldMap) -> AdapterResult<Submission> {
        let change_set = self.edit_change_set(id)?;
        let submission = self.submit(change_set, input)?;
        log_submission("book_update", &submission);
        Ok(submission)
    }

    /// Removes the stored book.
    pub fn destroy(&self, id: &Identifier) -> AdapterResult<()> {
        let book = self.show(id)?;
        self.adapter
            .persister()
            .delete_within(&book, self.adapter.deadline())?;
        info!("event=book_destroy module=service status=ok id={id}");
        Ok(())
    }

    fn submit(&self, mut change_set: ChangeSet<'_>, input: &FieldMap) -> AdapterResult<Submission> {
        if !change_set.validate(input) {
            return Ok(Submission::Invalid(change_set.errors().clone()));
        }

        let staged = change_set.sync()?;
        let stored = self
            .adapter
            .persister()
            .save_within(staged, self.adapter.deadline())?;
        Ok(Submission::Persisted(stored))
    }
}

fn log_submission(event: &str, submission: &Submission) {
    match submission {
        Submission::Persisted(book) => info!(
            "event={event} module=service status=ok id={}",
            book.id().map(Identifier::as_str).unwrap_or("-")
        ),
        Submission::Invalid(errors) => info!(
            "event={event} module=service status=invalid failed_fields={}",
            errors.len()
        ),
    }
}
