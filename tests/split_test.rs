//! Integration tests for splitting documents by range expressions.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::{make_nested_pdf, make_pdf, page_labels};
use pdfsplit::{
    assemble, extract_pages, split_file, DirectorySink, DownloadSink, Error, FileNaming,
    MemorySink, PagePolicy, RejectReason, SkipReason, SourceDocument, SplitOptions, SplitStatus,
    Splitter, PDF_MIME,
};

fn labels(pages: &[usize]) -> Vec<String> {
    pages.iter().map(|n| format!("Page {}", n)).collect()
}

/// Sink that refuses files whose name contains `reject`.
struct FlakySink {
    reject: &'static str,
    inner: MemorySink,
    attempts: AtomicUsize,
}

impl DownloadSink for FlakySink {
    fn deliver(&self, data: &[u8], filename: &str, mime: &str) -> pdfsplit::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if filename.contains(self.reject) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only target",
            )));
        }
        self.inner.deliver(data, filename, mime)
    }
}

// ==================== Source Document ====================

#[test]
fn test_source_page_count_and_version() {
    let source = SourceDocument::from_bytes(&make_pdf(7)).unwrap();
    assert_eq!(source.page_count(), 7);
    assert_eq!(source.version(), "1.7");
}

#[test]
fn test_source_rejects_garbage_after_header() {
    let result = SourceDocument::from_bytes(b"%PDF-1.4\nthis is not a pdf");
    assert!(result.is_err());
}

// ==================== Assembly ====================

#[test]
fn test_assemble_keeps_order_and_duplicates() {
    let source = SourceDocument::from_bytes(&make_pdf(5)).unwrap();
    let output = assemble(&source, &[4, 0, 0, 2]).unwrap();
    assert_eq!(output.page_count(), 4);

    let bytes = output.into_bytes().unwrap();
    assert_eq!(page_labels(&bytes), labels(&[5, 1, 1, 3]));
}

#[test]
fn test_assemble_out_of_range_index() {
    let source = SourceDocument::from_bytes(&make_pdf(2)).unwrap();
    let err = assemble(&source, &[0, 2]).unwrap_err();
    assert!(matches!(
        err,
        Error::PageOutOfRange {
            page: 3,
            page_count: 2
        }
    ));
}

#[test]
fn test_assemble_flattens_inherited_attributes() {
    let source = SourceDocument::from_bytes(&make_nested_pdf(2, 3)).unwrap();
    assert_eq!(source.page_count(), 5);

    let bytes = assemble(&source, &[3, 1]).unwrap().into_bytes().unwrap();
    assert_eq!(page_labels(&bytes), labels(&[4, 2]));

    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    for page_id in doc.get_pages().values() {
        let page = doc.get_dictionary(*page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
    }
}

#[test]
fn test_extract_pages_round_trips_through_source() {
    let bytes = extract_pages(&make_pdf(10), "2-4,9").unwrap();
    let again = SourceDocument::from_bytes(&bytes).unwrap();
    assert_eq!(again.page_count(), 4);
    assert_eq!(page_labels(&bytes), labels(&[2, 3, 4, 9]));
}

#[test]
fn test_extract_pages_nothing_selected() {
    let result = extract_pages(&make_pdf(3), "x");
    assert!(matches!(result, Err(Error::NothingToSplit(_))));
}

// ==================== Splitter ====================

#[test]
fn test_split_one_file_per_expression() {
    let source = SourceDocument::from_bytes(&make_pdf(10)).unwrap();
    let sink = MemorySink::new();

    let report = Splitter::new(&source)
        .with_file_name("book.pdf")
        .run(&["1-3", "5,3,5", "10"], &sink);

    assert_eq!(report.saved(), 3);
    assert_eq!(report.failed(), 0);
    assert_eq!(
        report.filenames(),
        vec!["book-1-1-3.pdf", "book-2-5_3_5.pdf", "book-3-10.pdf"]
    );

    let files = sink.take();
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|f| f.mime == PDF_MIME));
    assert_eq!(page_labels(&files[0].data), labels(&[1, 2, 3]));
    assert_eq!(page_labels(&files[1].data), labels(&[5, 3, 5]));
    assert_eq!(page_labels(&files[2].data), labels(&[10]));
}

#[test]
fn test_split_results_follow_expression_order() {
    let source = SourceDocument::from_bytes(&make_pdf(20)).unwrap();
    let expressions: Vec<String> = (1..=20).rev().map(|n| n.to_string()).collect();

    let report = Splitter::new(&source).run(&expressions, &MemorySink::new());

    let indices: Vec<usize> = report.results.iter().map(|r| r.index).collect();
    assert_eq!(indices, (0..20).collect::<Vec<_>>());
    assert_eq!(report.results[0].expression, "20");
    assert_eq!(report.filenames()[0], "split-1-20.pdf");
}

#[test]
fn test_split_parallel_and_sequential_agree() {
    let source = SourceDocument::from_bytes(&make_pdf(6)).unwrap();
    let expressions = ["1-2", "3-4", "6,5"];

    let parallel_sink = MemorySink::new();
    Splitter::new(&source).run(&expressions, &parallel_sink);
    let sequential_sink = MemorySink::new();
    Splitter::new(&source)
        .with_options(SplitOptions::new().sequential())
        .run(&expressions, &sequential_sink);

    let parallel: Vec<_> = parallel_sink
        .take()
        .into_iter()
        .map(|f| (f.filename.clone(), page_labels(&f.data)))
        .collect();
    let sequential: Vec<_> = sequential_sink
        .take()
        .into_iter()
        .map(|f| (f.filename.clone(), page_labels(&f.data)))
        .collect();
    assert_eq!(parallel, sequential);
}

#[test]
fn test_split_blank_and_rejected_expressions() {
    let source = SourceDocument::from_bytes(&make_pdf(5)).unwrap();
    let sink = MemorySink::new();

    let report = Splitter::new(&source).run(&["", "  ", "2-1", "1,x,3"], &sink);

    assert!(matches!(
        report.results[0].status,
        SplitStatus::Skipped(SkipReason::Blank)
    ));
    assert!(matches!(
        report.results[1].status,
        SplitStatus::Skipped(SkipReason::Blank)
    ));
    assert!(matches!(
        report.results[2].status,
        SplitStatus::Skipped(SkipReason::NoPages)
    ));
    assert_eq!(report.results[2].rejected[0].reason, RejectReason::ReversedRange);

    assert!(report.results[3].is_saved());
    assert_eq!(report.results[3].rejected.len(), 1);
    assert_eq!(report.results[3].rejected[0].token, "x");
    assert!(report.has_rejections());

    assert_eq!(report.skipped(), 3);
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_split_strict_policy_fails_only_that_expression() {
    let source = SourceDocument::from_bytes(&make_pdf(3)).unwrap();
    let sink = MemorySink::new();

    let report = Splitter::new(&source).run(&["1-2", "2-5", "3"], &sink);

    assert!(report.results[0].is_saved());
    match &report.results[1].status {
        SplitStatus::Failed(Error::PageOutOfRange { page, page_count }) => {
            assert_eq!(*page, 4);
            assert_eq!(*page_count, 3);
        }
        other => panic!("expected out-of-range failure, got {:?}", other),
    }
    assert!(report.results[2].is_saved());
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_split_skip_missing_policy() {
    let source = SourceDocument::from_bytes(&make_pdf(3)).unwrap();
    let sink = MemorySink::new();

    let report = Splitter::new(&source)
        .with_options(SplitOptions::new().with_policy(PagePolicy::SkipMissing))
        .run(&["2-5", "7-9"], &sink);

    assert!(report.results[0].is_saved());
    assert!(matches!(
        report.results[1].status,
        SplitStatus::Skipped(SkipReason::NoPages)
    ));
    let files = sink.take();
    assert_eq!(page_labels(&files[0].data), labels(&[2, 3]));
}

#[test]
fn test_split_delivery_failure_is_isolated() {
    let source = SourceDocument::from_bytes(&make_pdf(4)).unwrap();
    let sink = FlakySink {
        reject: "-2-",
        inner: MemorySink::new(),
        attempts: AtomicUsize::new(0),
    };

    let report = Splitter::new(&source)
        .with_file_name("deck.pdf")
        .run(&["1", "2", "3"], &sink);

    assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(report.saved(), 2);
    assert_eq!(report.failed(), 1);
    assert!(report.results[1].is_failed());
    assert_eq!(report.filenames(), vec!["deck-1-1.pdf", "deck-3-3.pdf"]);
}

#[test]
fn test_split_index_naming() {
    let source = SourceDocument::from_bytes(&make_pdf(3)).unwrap();
    let report = Splitter::new(&source)
        .with_file_name("a.pdf")
        .with_options(SplitOptions::new().with_naming(FileNaming::Index))
        .run(&["1-2", "3"], &MemorySink::new());
    assert_eq!(report.filenames(), vec!["a-1.pdf", "a-2.pdf"]);
}

// ==================== Files on disk ====================

#[test]
fn test_split_file_writes_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("report.pdf");
    std::fs::write(&input, make_pdf(8)).unwrap();
    let out = tmp.path().join("parts");

    let report = split_file(&input, &["1-4", "5-8"], &out, SplitOptions::default()).unwrap();

    assert_eq!(report.saved(), 2);
    let first = std::fs::read(out.join("report-1-1-4.pdf")).unwrap();
    let second = std::fs::read(out.join("report-2-5-8.pdf")).unwrap();
    assert_eq!(page_labels(&first), labels(&[1, 2, 3, 4]));
    assert_eq!(page_labels(&second), labels(&[5, 6, 7, 8]));
}

#[test]
fn test_directory_sink_creates_nested_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let sink = DirectorySink::new(tmp.path().join("a").join("b"));
    sink.deliver(b"%PDF-1.7", "x.pdf", PDF_MIME).unwrap();
    assert_eq!(
        std::fs::read(tmp.path().join("a/b/x.pdf")).unwrap(),
        b"%PDF-1.7"
    );
}

#[test]
fn test_directory_sink_long_expression_name_fits() {
    let tmp = tempfile::tempdir().unwrap();
    let source = SourceDocument::from_bytes(&make_pdf(120)).unwrap();
    let expr = (1..=100)
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let sink = DirectorySink::new(tmp.path());

    let report = Splitter::new(&source)
        .with_file_name("book.pdf")
        .run(&[expr.as_str()], &sink);

    assert!(report.results[0].is_saved(), "{:?}", report.results[0].status);
    let names = report.filenames();
    assert!(names[0].len() <= 255);
    let written = std::fs::read(tmp.path().join(names[0])).unwrap();
    assert_eq!(page_labels(&written).len(), 100);
}
