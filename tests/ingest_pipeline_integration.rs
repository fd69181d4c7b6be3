//! Integration tests for the decode -> frame -> parse -> store pipeline
//!
//! These run the pipeline stages directly, without a reader thread, and check
//! that the result does not depend on how the byte stream was chunked.

mod common;

use proptest::prelude::*;
use serial_plotter::ingest::{FrameAssembler, RecordParser, SeriesStore, Utf8Decoder};

/// Run `chunks` through every stage and return the resulting store
fn ingest(chunks: &[&[u8]], capacity: usize, bound: Option<f64>) -> (Vec<String>, SeriesStore) {
    ingest_capped(chunks, capacity, bound, None)
}

/// Same as [`ingest`], with a line-length cap on the assembler
fn ingest_capped(
    chunks: &[&[u8]],
    capacity: usize,
    bound: Option<f64>,
    max_line_len: Option<usize>,
) -> (Vec<String>, SeriesStore) {
    let mut decoder = Utf8Decoder::new();
    let mut assembler = FrameAssembler::with_max_line_len(max_line_len);
    let parser = RecordParser::new();
    let mut store = SeriesStore::new(capacity, bound);
    let mut lines = Vec::new();

    for chunk in chunks {
        let decoded = decoder.decode(chunk);
        for line in assembler.feed(&decoded.text) {
            if let Ok(record) = parser.parse(&line) {
                for (name, value) in &record.pairs {
                    store.apply(name, *value);
                }
            }
            lines.push(line);
        }
    }
    (lines, store)
}

/// Split `bytes` at the given cut points
fn split_at_cuts<'a>(bytes: &'a [u8], cuts: &[usize]) -> Vec<&'a [u8]> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for p in points {
        chunks.push(&bytes[start..p]);
        start = p;
    }
    chunks.push(&bytes[start..]);
    chunks
}

fn record_strategy() -> impl Strategy<Value = String> {
    let name = "[a-zA-Z_][a-zA-Z0-9_]{0,6}";
    let value = prop_oneof![
        (-1e6f64..1e6).prop_map(|v| format!("{:.3}", v)),
        // Letters that cannot spell "inf" or "nan"
        "[b-h]{1,3}".prop_map(|s| s),
    ];
    prop::collection::vec((name, value), 1..5).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(n, v)| format!("{} {}", n, v))
            .collect::<Vec<_>>()
            .join(" ")
    })
}

fn stream_strategy() -> impl Strategy<Value = String> {
    let terminator = prop_oneof![Just("\n"), Just("\r"), Just("\r\n")];
    prop::collection::vec((record_strategy(), terminator), 0..20).prop_map(|lines| {
        lines
            .into_iter()
            .map(|(line, term)| format!("{}{}", line, term))
            .collect::<String>()
    })
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_lines_or_series(
        stream in stream_strategy(),
        cuts in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let bytes = stream.as_bytes();
        let (whole_lines, whole_store) = ingest(&[bytes], 8, Some(1000.0));
        let chunks = split_at_cuts(bytes, &cuts);
        let (split_lines, split_store) = ingest(&chunks, 8, Some(1000.0));

        prop_assert_eq!(whole_lines, split_lines);
        prop_assert_eq!(whole_store.snapshot(), split_store.snapshot());
    }

    #[test]
    fn prop_line_cap_does_not_depend_on_chunking(
        stream in stream_strategy(),
        cuts in prop::collection::vec(any::<usize>(), 0..12),
        cap in 4usize..40,
    ) {
        let bytes = stream.as_bytes();
        let (whole_lines, whole_store) = ingest_capped(&[bytes], 8, None, Some(cap));
        let chunks = split_at_cuts(bytes, &cuts);
        let (split_lines, split_store) = ingest_capped(&chunks, 8, None, Some(cap));

        prop_assert!(whole_lines.iter().all(|line| line.len() <= cap));
        prop_assert_eq!(whole_lines, split_lines);
        prop_assert_eq!(whole_store.snapshot(), split_store.snapshot());
    }

    #[test]
    fn prop_multibyte_text_survives_any_split(
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let text = "µT 1 ΔV 2\r\nµT 3 ΔV 4\n";
        let chunks = split_at_cuts(text.as_bytes(), &cuts);
        let (lines, _) = ingest(&chunks, 8, None);
        prop_assert_eq!(lines, vec!["µT 1 ΔV 2".to_string(), "µT 3 ΔV 4".to_string()]);
    }
}

#[test]
fn test_reference_records() {
    let (_, store) = ingest(&[b"A 1.0 B 2.0\nA 1.0 B\nA x B 2.0\n".as_slice()], 10, None);
    let a: Vec<f64> = store.get("A").unwrap().samples().iter().copied().collect();
    let b: Vec<f64> = store.get("B").unwrap().samples().iter().copied().collect();
    assert_eq!(a, vec![1.0]);
    assert_eq!(b, vec![2.0, 2.0]);
}

#[test]
fn test_non_ascii_names_are_split_by_sanitizing() {
    // Non-printable characters become spaces, so "µT" loses its first char
    let (_, store) = ingest(&["µT 1 V 2\n".as_bytes()], 10, None);
    assert_eq!(store.names().collect::<Vec<_>>(), vec!["T", "V"]);
}

#[test]
fn test_oversized_line_split_across_chunks_adds_no_series() {
    let stream = b"xx 1 yy 2 zz 3 ww 4\nok 1 fine 2\n";
    let (whole_lines, _) = ingest_capped(&[stream.as_slice()], 10, None, Some(12));
    let (split_lines, store) =
        ingest_capped(&[&stream[..9], &stream[9..]], 10, None, Some(12));

    assert_eq!(whole_lines, vec!["ok 1 fine 2"]);
    assert_eq!(split_lines, whole_lines);
    assert_eq!(store.names().collect::<Vec<_>>(), vec!["ok", "fine"]);
}

#[test]
fn test_line_without_terminator_is_held_back() {
    let (lines, store) = ingest(&[b"a 1 b 2\nc 3 d 4".as_slice()], 10, None);
    assert_eq!(lines, vec!["a 1 b 2"]);
    assert!(store.get("c").is_none());
}
