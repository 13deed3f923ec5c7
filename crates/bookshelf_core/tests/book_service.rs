use bookshelf_core::model::book::{AUTHOR, SERIES, TITLE};
use bookshelf_core::{
    field_map, AdapterError, Backend, BackendConfig, BookService, CoreConfig, FieldValue,
    Identifier, MemoryStore, Submission,
};
use std::time::Duration;

#[test]
fn create_persists_valid_input() {
    let store = MemoryStore::new();
    let adapter = store.metadata_adapter();
    let books = BookService::new(&adapter);

    let submission = books
        .create(&field_map([(TITLE, "Piranesi"), (AUTHOR, "Susanna Clarke")]))
        .unwrap();

    let Submission::Persisted(book) = submission else {
        panic!("expected persisted book");
    };
    let id = book.id().cloned().unwrap();
    assert_eq!(books.show(&id).unwrap().set_values(TITLE), ["Piranesi"]);
    assert_eq!(books.count().unwrap(), 1);
}

#[test]
fn create_with_blank_title_writes_nothing() {
    let store = MemoryStore::new();
    let adapter = store.metadata_adapter();
    let books = BookService::new(&adapter);

    let submission = books
        .create(&field_map([(TITLE, ""), (AUTHOR, "A")]))
        .unwrap();

    let Submission::Invalid(errors) = submission else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.get(TITLE), ["can't be blank"]);
    assert_eq!(store.record_count().unwrap(), 0);
    assert!(books.index().unwrap().is_empty());
}

#[test]
fn create_ignores_unknown_fields() {
    let store = MemoryStore::new();
    let adapter = store.metadata_adapter();
    let books = BookService::new(&adapter);
    let mut input = field_map([(TITLE, "T"), (AUTHOR, "A")]);
    input.insert("admin".to_string(), FieldValue::Bool(true));

    let submission = books.create(&input).unwrap();

    let Submission::Persisted(book) = submission else {
        panic!("expected persisted book");
    };
    assert!(book.get("admin").is_none());
}

#[test]
fn update_keeps_fields_missing_from_input() {
    let store = MemoryStore::new();
    let adapter = store.metadata_adapter();
    let books = BookService::new(&adapter);
    let Submission::Persisted(book) = books
        .create(&field_map([(TITLE, "T"), (AUTHOR, "A"), (SERIES, "S")]))
        .unwrap()
    else {
        panic!("expected persisted book");
    };
    let id = book.id().cloned().unwrap();

    let updated = books
        .update(&id, &field_map([(TITLE, "T2"), (AUTHOR, "A")]))
        .unwrap();

    assert!(updated.is_persisted());
    let stored = books.show(&id).unwrap();
    assert_eq!(stored.set_values(TITLE), ["T2"]);
    assert_eq!(stored.scalar(SERIES), Some("S"));
    assert_eq!(books.count().unwrap(), 1);
}

#[test]
fn invalid_update_leaves_stored_book_untouched() {
    let store = MemoryStore::new();
    let adapter = store.metadata_adapter();
    let books = BookService::new(&adapter);
    let Submission::Persisted(book) = books
        .create(&field_map([(TITLE, "T"), (AUTHOR, "A")]))
        .unwrap()
    else {
        panic!("expected persisted book");
    };
    let id = book.id().cloned().unwrap();

    let submission = books
        .update(&id, &field_map([(TITLE, "New"), (AUTHOR, " ")]))
        .unwrap();

    assert!(!submission.is_persisted());
    assert_eq!(books.show(&id).unwrap().set_values(TITLE), ["T"]);
}

#[test]
fn update_must_resubmit_title_and_author() {
    let store = MemoryStore::new();
    let adapter = store.metadata_adapter();
    let books = BookService::new(&adapter);
    let Submission::Persisted(book) = books
        .create(&field_map([(TITLE, "T"), (AUTHOR, "A")]))
        .unwrap()
    else {
        panic!("expected persisted book");
    };
    let id = book.id().cloned().unwrap();

    let submission = books.update(&id, &field_map([(SERIES, "S")])).unwrap();

    let Submission::Invalid(errors) = submission else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.get(TITLE), ["can't be blank"]);
    assert_eq!(errors.get(AUTHOR), ["can't be blank"]);
    let stored = books.show(&id).unwrap();
    assert!(stored.attributes_eq(&book));
    assert_eq!(stored.scalar(SERIES), None);
}

#[test]
fn update_and_destroy_of_unknown_book_are_not_found() {
    let store = MemoryStore::new();
    let adapter = store.metadata_adapter();
    let books = BookService::new(&adapter);
    let id = Identifier::new("missing").unwrap();

    assert!(matches!(
        books.update(&id, &field_map([(TITLE, "T"), (AUTHOR, "A")])),
        Err(AdapterError::NotFound { .. })
    ));
    assert!(matches!(
        books.destroy(&id),
        Err(AdapterError::NotFound { .. })
    ));
}

#[test]
fn destroy_removes_book() {
    let store = MemoryStore::new();
    let adapter = store.metadata_adapter();
    let books = BookService::new(&adapter);
    let Submission::Persisted(book) = books
        .create(&field_map([(TITLE, "T"), (AUTHOR, "A")]))
        .unwrap()
    else {
        panic!("expected persisted book");
    };
    let id = book.id().cloned().unwrap();

    books.destroy(&id).unwrap();

    assert!(matches!(books.show(&id), Err(AdapterError::NotFound { .. })));
    assert_eq!(books.count().unwrap(), 0);
}

#[test]
fn edit_change_set_is_bound_to_stored_book() {
    let store = MemoryStore::new();
    let adapter = store.metadata_adapter();
    let books = BookService::new(&adapter);
    let Submission::Persisted(book) = books
        .create(&field_map([(TITLE, "T"), (AUTHOR, "A")]))
        .unwrap()
    else {
        panic!("expected persisted book");
    };
    let id = book.id().cloned().unwrap();

    let edit = books.edit_change_set(&id).unwrap();
    assert_eq!(edit.resource().id(), Some(&id));
    assert!(edit.errors().is_empty());
    assert!(!books.new_change_set().unwrap().resource().is_persisted());
}

#[test]
fn configured_sqlite_backend_serves_books() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig {
        backend: BackendConfig::Sqlite {
            path: Some(dir.path().join("books.db")),
        },
        call_timeout_ms: Some(2_000),
        ..CoreConfig::default()
    };

    let backend = Backend::open(&config).unwrap();
    assert_eq!(backend.kind(), "sqlite");
    let adapter = backend.metadata_adapter(config.call_timeout()).unwrap();
    assert_eq!(adapter.call_timeout(), Some(Duration::from_millis(2_000)));
    let books = BookService::new(&adapter);

    let submission = books
        .create(&field_map([(TITLE, "T"), (AUTHOR, "A")]))
        .unwrap();
    assert!(submission.is_persisted());
    assert_eq!(books.index().unwrap().len(), 1);
}

#[test]
fn configured_memory_backend_serves_books() {
    let backend = Backend::open(&CoreConfig::default()).unwrap();
    assert_eq!(backend.kind(), "memory");
    let adapter = backend.metadata_adapter(None).unwrap();
    let books = BookService::new(&adapter);

    assert!(books.index().unwrap().is_empty());
    assert!(books
        .create(&field_map([(TITLE, "T"), (AUTHOR, "A")]))
        .unwrap()
        .is_persisted());
    assert_eq!(books.count().unwrap(), 1);
}
