//! Integration tests for the query engine: pagination, search, sort, columns,
//! export and the year filter.

use std::io::Write;
use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::*;

use mboxnav::config::Config;
use mboxnav::error::MboxError;
use mboxnav::export::mbox::extract_year;
use mboxnav::index::{build_index, IndexOptions, MailboxIndex, MailboxStats};
use mboxnav::session::sort::{SortDirection, SortField};
use mboxnav::session::Session;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn index_of(path: &Path) -> MailboxIndex {
    build_index(path, &IndexOptions::default(), None).unwrap()
}

fn session_of(path: &Path) -> Session {
    Session::new(index_of(path), &Config::default()).unwrap()
}

// ─── Pagination ─────────────────────────────────────────────────────

#[test]
fn test_paginate_large_generated_mailbox() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("big.mbox");
    let mut out = std::fs::File::create(file.path()).unwrap();
    for i in 0..2345 {
        write!(
            out,
            "From user{i}@example.com Mon Jan  1 00:00:00 2024\n\
             From: user{i}@example.com\n\
             Subject: message {i}\n\
             Date: Mon, 1 Jan 2024 00:00:00 +0000\n\
             \n\
             body\n\
             \n"
        )
        .unwrap();
    }
    drop(out);

    let mut session = session_of(file.path());
    assert_eq!(session.index().size(), 2345);

    let page = session.list(None).unwrap();
    assert_eq!((page.start, page.end()), (0, 20));
    let page = session.next(None).unwrap();
    assert_eq!((page.start, page.end()), (20, 40));
    let page = session.prev(None).unwrap();
    assert_eq!((page.start, page.end()), (0, 20));
    let page = session.prev(None).unwrap();
    assert_eq!(page.start, 0, "backing up before the start clamps to 0");

    // Walk to the end: the last page is partial and repeats, never wraps
    let mut last = session.list(Some(100)).unwrap();
    for _ in 0..30 {
        last = session.next(None).unwrap();
    }
    assert_eq!((last.start, last.end()), (2300, 2345));
    assert_eq!(
        session.records(&last).last().unwrap().subject(),
        "message 2344"
    );
}

#[test]
fn test_list_with_maximum_page_size() {
    let mut session = session_of(&fixture("years.mbox"));
    session.list(Some(2)).unwrap();
    let page = session.list(Some(usize::MAX)).unwrap();
    assert_eq!((page.start, page.end()), (2, 7));
    let page = session.next(None).unwrap();
    assert_eq!((page.start, page.end()), (0, 7));
}

// ─── Search ─────────────────────────────────────────────────────────

#[test]
fn test_search_is_case_insensitive_on_from_and_subject() {
    let mut session = session_of(&fixture("years.mbox"));
    let outcome = session.search("ALPHA.ORG").unwrap();
    assert_eq!(outcome.matches, vec![0, 2, 5]);

    let outcome = session.search("budget").unwrap();
    assert_eq!(outcome.matches, vec![0, 3]);
    assert_eq!(session.view(), &[0, 3]);
    assert!(!outcome.is_truncated());

    let outcome = session.search("no such text").unwrap();
    assert_eq!(outcome.total(), 0);
    assert!(matches!(
        session.search("  "),
        Err(MboxError::InvalidArgument(_))
    ));
}

// ─── Sort ───────────────────────────────────────────────────────────

#[test]
fn test_date_sort_puts_unparsed_last_both_ways() {
    let mut session = session_of(&fixture("years.mbox"));

    session.sort(SortField::Date, SortDirection::Asc);
    let asc = session.view().to_vec();
    assert_eq!(asc, vec![0, 3, 4, 1, 5, 6, 2]);

    session.sort(SortField::Date, SortDirection::Desc);
    let desc = session.view().to_vec();
    assert_eq!(desc, vec![6, 5, 1, 4, 3, 0, 2]);

    // Parsed records are exact reverses of each other
    let mut reversed = asc[..6].to_vec();
    reversed.reverse();
    assert_eq!(reversed, desc[..6].to_vec());
}

#[test]
fn test_sort_is_stable_and_idempotent() {
    let mut session = session_of(&fixture("years.mbox"));
    session.sort(SortField::From, SortDirection::Asc);
    let once = session.view().to_vec();
    session.sort(SortField::From, SortDirection::Asc);
    assert_eq!(session.view(), once.as_slice());

    session.sort(SortField::Subject, SortDirection::Asc);
    let subjects: Vec<String> = session
        .view()
        .iter()
        .map(|&i| session.index().records()[i].subject().to_lowercase())
        .collect();
    let mut sorted = subjects.clone();
    sorted.sort();
    assert_eq!(subjects, sorted);

    // Sorting never renumbers records
    for (i, record) in session.index().records().iter().enumerate() {
        assert_eq!(record.index, i);
    }
}

#[test]
fn test_sort_resets_cursor() {
    let mut session = session_of(&fixture("years.mbox"));
    session.list(Some(3)).unwrap();
    session.next(None).unwrap();
    assert_eq!(session.cursor().position(), 6);
    session.sort(SortField::Subject, SortDirection::Desc);
    assert_eq!(session.cursor().position(), 0);
}

// ─── Columns ────────────────────────────────────────────────────────

#[test]
fn test_unknown_column_leaves_state_untouched() {
    let mut session = session_of(&fixture("simple.mbox"));
    session.set_columns("index, to, cc").unwrap();
    assert_eq!(session.columns().to_string(), "index,to,cc");

    let err = session.set_columns("date,size").unwrap_err();
    assert!(matches!(err, MboxError::UnknownColumn(ref c) if c == "size"));
    assert_eq!(session.columns().to_string(), "index,to,cc");

    let record = session.get(1).unwrap().clone();
    assert_eq!(
        session.row(&record),
        vec!["1", "list@example.org", "archive@example.org"]
    );
}

// ─── Export ─────────────────────────────────────────────────────────

#[test]
fn test_export_is_byte_identical() {
    let source = fixture("simple.mbox");
    let bytes = std::fs::read(&source).unwrap();
    let dir = assert_fs::TempDir::new().unwrap();
    let mut session = session_of(&source);

    for ordinal in 0..session.index().size() {
        let dest = dir.child(format!("msg{ordinal}.eml"));
        let written = session.export(ordinal, dest.path()).unwrap();
        assert_eq!(written, dest.path());

        let range = session.get(ordinal).unwrap().byte_range();
        let expected = &bytes[range.start as usize..range.end as usize];
        dest.assert(predicate::path::exists());
        assert_eq!(std::fs::read(dest.path()).unwrap(), expected);
    }

    // Source untouched
    assert_eq!(std::fs::read(&source).unwrap(), bytes);
}

#[test]
fn test_export_refuses_alias_of_source() {
    let dir = assert_fs::TempDir::new().unwrap();
    let mailbox = dir.child("mail.mbox");
    mailbox.write_file(&fixture("simple.mbox")).unwrap();
    dir.child("sub").create_dir_all().unwrap();
    let bytes = std::fs::read(mailbox.path()).unwrap();

    let mut session = session_of(mailbox.path());
    let alias = dir.path().join("sub").join("..").join("mail.mbox");
    assert!(matches!(
        session.export(0, &alias),
        Err(MboxError::InvalidArgument(_))
    ));
    assert_eq!(std::fs::read(mailbox.path()).unwrap(), bytes);
    assert_eq!(session.index().size(), 5);
}

#[test]
fn test_export_uses_current_view_and_directory_names() {
    let dir = assert_fs::TempDir::new().unwrap();
    let mut session = session_of(&fixture("years.mbox"));
    session.search("launch").unwrap();

    let written = session.export(0, dir.path()).unwrap();
    let name = written.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("20230601_091533_bob@beta.net_Launch_plan"), "{name}");
    assert!(name.ends_with(".eml"));

    assert!(matches!(
        session.export(1, dir.path()),
        Err(MboxError::OutOfRange { ordinal: 1, len: 1 })
    ));
    let missing_parent = dir.child("no/such/dir/out.eml");
    assert!(matches!(
        session.export(0, missing_parent.path()),
        Err(MboxError::Io { .. })
    ));
}

// ─── Statistics ─────────────────────────────────────────────────────

#[test]
fn test_stats_over_years_fixture() {
    let index = index_of(&fixture("years.mbox"));
    let stats = MailboxStats::compute(&index);
    assert_eq!(stats.total, 7);
    assert_eq!(stats.parsed_dates, 6);
    assert_eq!(stats.unparsed_dates, 1);
    assert_eq!(stats.earliest.unwrap().year(), 2021);
    assert_eq!(stats.latest.unwrap().year(), 2024);
    assert_eq!(stats.file_size, std::fs::metadata(fixture("years.mbox")).unwrap().len());
    assert_eq!(stats.top_domains[0], ("alpha.org".to_string(), 3));
}

// ─── Year filter ────────────────────────────────────────────────────

#[test]
fn test_extract_year_2023() {
    let dir = assert_fs::TempDir::new().unwrap();
    let output = dir.child("2023.mbox");
    let index = index_of(&fixture("years.mbox"));

    let report = extract_year(&index, 2023, output.path(), true).unwrap();
    assert_eq!(report.scanned, 7);
    assert_eq!(report.matched, 3);
    assert_eq!(report.unparsed, 1);
    assert_eq!(report.diagnostics.len(), 3);
    assert_eq!(
        report.bytes_written,
        std::fs::metadata(output.path()).unwrap().len()
    );

    output.assert(predicate::str::contains("Subject: Launch plan"));
    output.assert(predicate::str::contains("Subject: Quarterly numbers"));
    output.assert(predicate::str::contains("Subject: No Date header"));
    output.assert(predicate::str::contains("Budget").not());
    // Written in date-as-written terms: 2024-01-01 +0500 is not 2023
    output.assert(predicate::str::contains("New year").not());

    // The output is itself a valid mailbox with the same messages, in file order
    let reindexed = index_of(output.path());
    let subjects: Vec<&str> = reindexed.records().iter().map(|r| r.subject()).collect();
    assert_eq!(
        subjects,
        vec!["Launch plan", "Quarterly numbers", "No Date header"]
    );
}

#[test]
fn test_extract_year_without_matches_and_onto_source() {
    let dir = assert_fs::TempDir::new().unwrap();
    let output = dir.child("1999.mbox");
    let index = index_of(&fixture("years.mbox"));

    let report = extract_year(&index, 1999, output.path(), false).unwrap();
    assert_eq!(report.matched, 0);
    assert!(report.diagnostics.is_empty());
    output.assert("");

    assert!(matches!(
        extract_year(&index, 2023, &fixture("years.mbox"), false),
        Err(MboxError::InvalidArgument(_))
    ));
}
