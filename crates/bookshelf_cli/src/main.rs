//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire configuration, logging and the configured backend end to end.
//! - Run one create/list/destroy round through the book service.

use bookshelf_core::{
    core_version, field_map, init_logging_from_config, Backend, BookService, CoreConfig,
    Submission,
};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("bookshelf error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_logging_from_config(&config)?;
    println!("bookshelf_core version={}", core_version());

    let backend = Backend::open(&config).map_err(|err| err.to_string())?;
    let adapter = backend
        .metadata_adapter(config.call_timeout())
        .map_err(|err| err.to_string())?;
    let books = BookService::new(&adapter);
    println!("backend={}", backend.kind());

    let rejected = books
        .create(&field_map([("title", ""), ("author", "")]))
        .map_err(|err| err.to_string())?;
    if let Submission::Invalid(errors) = &rejected {
        println!("rejected blank book: {errors}");
    }

    let created = books
        .create(&field_map([
            ("title", "The Left Hand of Darkness"),
            ("author", "Ursula K. Le Guin"),
            ("series", "Hainish Cycle"),
        ]))
        .map_err(|err| err.to_string())?;
    let Submission::Persisted(book) = created else {
        return Err("smoke book failed validation".to_string());
    };
    let id = book
        .id()
        .cloned()
        .ok_or_else(|| "stored book has no identifier".to_string())?;
    println!("created book id={id}");

    let count = books.count().map_err(|err| err.to_string())?;
    println!("books stored={count}");

    books.destroy(&id).map_err(|err| err.to_string())?;
    println!("destroyed book id={id}");
    Ok(())
}
