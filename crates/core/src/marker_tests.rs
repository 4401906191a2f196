// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn done_matches_whole_line() {
    assert_eq!(Marker::parse_line("<ralph>DONE</ralph>"), Some(Marker::Done));
    assert_eq!(Marker::parse_line("  <ralph>DONE</ralph>\t"), Some(Marker::Done));
}

#[parameterized(
    narration = { "the LEARNING section says to emit <ralph>DONE</ralph>" },
    trailing_text = { "<ralph>DONE</ralph> and then some" },
    leading_text = { "ok <ralph>DONE</ralph>" },
    lowercase = { "<ralph>done</ralph>" },
    plain_text = { "all done" },
    unclosed = { "<ralph>DONE" },
)]
fn non_marker_lines_do_not_match(line: &str) {
    match Marker::parse_line(line) {
        None => {}
        // lowercase "done" is a well-formed tag with an unknown body
        Some(Marker::Advisory(body)) => assert_eq!(body, "done"),
        Some(other) => panic!("unexpected marker {other:?} for {line:?}"),
    }
}

#[test]
fn stuck_with_and_without_reason() {
    assert_eq!(Marker::parse_line("<ralph>STUCK</ralph>"), Some(Marker::Stuck(None)));
    assert_eq!(
        Marker::parse_line("<ralph>STUCK: migrations will not apply</ralph>"),
        Some(Marker::Stuck(Some("migrations will not apply".to_string())))
    );
}

#[test]
fn learning_carries_trimmed_text() {
    assert_eq!(
        Marker::parse_line("<ralph>LEARNING:  use bcrypt for hashing </ralph>"),
        Some(Marker::Learning("use bcrypt for hashing".to_string()))
    );
}

#[test]
fn empty_learning_degrades_to_advisory() {
    assert_eq!(
        Marker::parse_line("<ralph>LEARNING:   </ralph>"),
        Some(Marker::Advisory("LEARNING:   ".to_string()))
    );
}

#[test]
fn unknown_tags_are_advisory() {
    assert_eq!(
        Marker::parse_line("<ralph>PROGRESS:50</ralph>"),
        Some(Marker::Advisory("PROGRESS:50".to_string()))
    );
}

#[test]
fn kind_and_value_expose_payloads() {
    let m = Marker::Stuck(Some("why".to_string()));
    assert_eq!(m.kind(), "STUCK");
    assert_eq!(m.value(), Some("why"));
    assert_eq!(Marker::Done.value(), None);
}

#[test]
fn contract_lists_the_three_markers() {
    let contract = Marker::contract();
    assert!(contract.contains("<ralph>DONE</ralph>"));
    assert!(contract.contains("<ralph>STUCK:reason</ralph>"));
    assert!(contract.contains("<ralph>LEARNING:text</ralph>"));
}
