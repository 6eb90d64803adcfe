//! Integration tests for split session state.

mod common;

use std::sync::{Arc, Mutex};

use common::{make_pdf, page_labels};
use pdfsplit::{Error, MemorySink, SplitOptions, SplitSession};

#[test]
fn test_load_sets_page_count() {
    let mut session = SplitSession::new();
    assert!(!session.can_split());

    assert!(session.load("book.pdf", make_pdf(6)));
    assert_eq!(session.file_name(), Some("book.pdf"));
    assert_eq!(session.page_count(), Some(6));
    assert!(session.last_error().is_none());
    // Only the initial blank range slot exists.
    assert!(!session.can_split());

    session.ranges_mut().set(0, "1-2").unwrap();
    assert!(session.can_split());
}

#[test]
fn test_stale_ticket_is_discarded() {
    let mut session = SplitSession::new();
    let first = session.begin_load("first.pdf", make_pdf(3));
    let second = session.begin_load("second.pdf", make_pdf(8));

    // The first parse finishes after the second file was selected.
    let late = first.parse();
    assert!(!session.finish_load(&first, late));
    assert_eq!(session.page_count(), None);

    let result = second.parse();
    assert!(session.finish_load(&second, result));
    assert_eq!(session.file_name(), Some("second.pdf"));
    assert_eq!(session.page_count(), Some(8));
}

#[test]
fn test_clear_makes_pending_ticket_stale() {
    let mut session = SplitSession::new();
    let ticket = session.begin_load("a.pdf", make_pdf(2));
    session.clear();

    let result = ticket.parse();
    assert!(!session.finish_load(&ticket, result));
    assert_eq!(session.file_name(), None);
    assert!(session.document().is_none());
}

#[test]
fn test_parse_failure_is_recorded() {
    let mut session = SplitSession::new();
    session.ranges_mut().set(0, "1").unwrap();

    assert!(session.load("notes.txt", b"plain text".to_vec()));
    assert!(matches!(session.last_error(), Some(Error::UnknownFormat)));
    assert_eq!(session.page_count(), None);
    assert!(!session.can_split());

    // A later good file clears the error.
    assert!(session.load("good.pdf", make_pdf(1)));
    assert!(session.last_error().is_none());
    assert!(session.can_split());
}

#[test]
fn test_page_count_store_notifies() {
    let mut session = SplitSession::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = session
        .page_count_store()
        .subscribe(move |count| sink.lock().unwrap().push(*count));

    session.load("a.pdf", make_pdf(4));
    session.clear();

    // Initial value, reset on selection, parsed count, reset on clear.
    assert_eq!(*seen.lock().unwrap(), vec![None, None, Some(4), None]);
}

#[test]
fn test_split_uses_ranges_and_file_name() {
    let mut session = SplitSession::new();
    session.load("slides.pdf", make_pdf(5));
    session.ranges_mut().set(0, "5,1").unwrap();
    session.ranges_mut().push();
    session.ranges_mut().push_expression("2-3");

    let sink = MemorySink::new();
    let report = session.split(&sink, SplitOptions::default()).unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.saved(), 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(
        report.filenames(),
        vec!["slides-1-5_1.pdf", "slides-3-2-3.pdf"]
    );

    let files = sink.take();
    assert_eq!(page_labels(&files[0].data), vec!["Page 5", "Page 1"]);
}

#[test]
fn test_split_without_document() {
    let mut session = SplitSession::new();
    session.ranges_mut().set(0, "1").unwrap();
    let err = session
        .split(&MemorySink::new(), SplitOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::NothingToSplit(_)));
}

#[test]
fn test_split_with_blank_ranges() {
    let mut session = SplitSession::new();
    session.load("a.pdf", make_pdf(2));
    session.ranges_mut().push();
    let err = session
        .split(&MemorySink::new(), SplitOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::NothingToSplit(_)));
}

#[test]
fn test_range_slot_removal() {
    let mut session = SplitSession::new();
    session.ranges_mut().push_expression("3");
    assert!(matches!(
        session.ranges_mut().remove(0),
        Err(Error::FirstRangeRemoval)
    ));
    assert_eq!(session.ranges_mut().remove(1).unwrap(), "3");
    assert!(matches!(
        session.ranges_mut().remove(1),
        Err(Error::NoSuchRange(1))
    ));
    assert_eq!(session.ranges().len(), 1);
}
