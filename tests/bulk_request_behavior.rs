//! Behavior-driven tests for bulk request construction
//!
//! These tests verify HOW the system assembles bulk request bodies from
//! keyword parameters and caller-supplied request text.

use std::io::{Cursor, Write};

use fedroute_core::{build_bulk_string, split_bulk, BulkError, BulkPayload, QueryParams};

const FIVE_LINES: &str = "IU ANMO 00 BHZ 2010-02-27T06:30:00 2010-02-27T06:33:00
IU COLA 00 BHZ 2010-02-27T06:30:00 2010-02-27T06:33:00
GE APE -- BHZ 2010-02-27T06:30:00 2010-02-27T06:33:00
IV ACER -- HHZ 2010-02-27T06:30:00 2010-02-27T06:33:00
CH DAVOX -- BHZ 2010-02-27T06:30:00 2010-02-27T06:33:00";

// =============================================================================
// Bulk String: Parameters
// =============================================================================

#[test]
fn when_parameters_are_given_system_writes_them_before_the_request_lines() {
    // Given: Three set parameters and one unset parameter
    let mut params = QueryParams::new()
        .with("quality", "B")
        .with("longestonly", false)
        .with("minimumlength", 25.0);
    params.insert("format", None);

    // When: The bulk string is built
    let bulk = build_bulk_string(BulkPayload::text(FIVE_LINES), &params).expect("text payload");

    // Then: Parameter lines come first and the unset one is omitted
    let lines: Vec<&str> = bulk.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(&lines[..3], ["longestonly=false", "minimumlength=25.0", "quality=B"]);
    assert!(!bulk.contains("format="));
    assert_eq!(lines[3..].join("\n"), FIVE_LINES);
}

#[test]
fn when_no_parameters_are_given_system_returns_the_text_unchanged() {
    // Given / When: A text payload with no parameters
    let bulk = build_bulk_string(BulkPayload::text(FIVE_LINES), &QueryParams::new()).expect("text payload");

    // Then: The body is exactly the request text
    assert_eq!(bulk, FIVE_LINES);
}

#[test]
fn when_bulk_string_is_split_system_recovers_parameters_and_lines() {
    // Given: A bulk string built from parameters and five request lines
    let params = QueryParams::new().with("level", "channel");
    let bulk = build_bulk_string(BulkPayload::text(FIVE_LINES), &params).expect("text payload");

    // When: It is split
    let (parameters, lines) = split_bulk(&bulk);

    // Then: Both halves are recovered
    assert_eq!(parameters, vec![String::from("level=channel")]);
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[2].network(), "GE");
}

// =============================================================================
// Bulk String: Payload Sources
// =============================================================================

#[test]
fn when_text_names_an_existing_file_system_reads_the_file() {
    // Given: Request lines stored in a temporary file
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(FIVE_LINES.as_bytes()).expect("write request lines");
    let path = file.path().display().to_string();

    // When: The bulk string is built from the path text and from the path itself
    let from_text = build_bulk_string(BulkPayload::text(path), &QueryParams::new()).expect("file payload");
    let from_path = build_bulk_string(BulkPayload::Path(file.path().to_path_buf()), &QueryParams::new())
        .expect("file payload");

    // Then: Both carry the file contents
    assert_eq!(from_text, FIVE_LINES);
    assert_eq!(from_path, FIVE_LINES);
}

#[test]
fn when_reader_is_given_system_consumes_it() {
    // Given: Request lines behind a reader
    let reader = Cursor::new(FIVE_LINES.as_bytes().to_vec());

    // When: The bulk string is built
    let bulk = build_bulk_string(
        BulkPayload::Reader(Box::new(reader)),
        &QueryParams::new().with("level", "station"),
    )
    .expect("reader payload");

    // Then: The reader contents follow the parameter line
    assert!(bulk.starts_with("level=station\nIU ANMO"));
}

#[test]
fn when_records_are_given_system_rejects_them() {
    // Given: Pre-split records instead of text
    let records = vec![vec![String::from("IU"), String::from("ANMO")]];

    // When: The bulk string is built
    let error = build_bulk_string(BulkPayload::Records(records), &QueryParams::new())
        .expect_err("records are unsupported");

    // Then: The error names the payload kind
    assert!(matches!(error, BulkError::UnsupportedBulkType { kind: "records" }));
}

#[test]
fn when_path_is_missing_system_reports_an_io_error() {
    // Given: A path that does not exist
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.txt");

    // When / Then: Reading fails with an I/O error
    let error = build_bulk_string(BulkPayload::Path(missing), &QueryParams::new())
        .expect_err("missing file");
    assert!(matches!(error, BulkError::Io(_)));
}
