use crate::harness::{PreviewMatch, Scenario, SessionStateMatch};
use learnvault_core::{ContentCategory, ErrorKind};

#[test]
fn test_new_record_with_upload() {
    Scenario::new("new_record_with_upload")
        .with_category("言語")
        .bootstraps()
        .assert_ok()
        .opens_new("Ownership")
        .assert_state(SessionStateMatch::Drafting)
        .sets_tags(&["Rust", "基礎"])
        .sets_category("言語")
        .uploads("ownership.md", b"# Ownership\n\nmoves and copies")
        .assert_ok()
        .assert_state(SessionStateMatch::FileStaged)
        .assert_staged("ownership.md")
        .assert_preview(PreviewMatch::TextContains("moves and copies".into()))
        .submits()
        .assert_ok()
        .assert_state(SessionStateMatch::Committed)
        .assert_notice_contains("Saved (revision")
        .assert_remote_file("ownership.md", b"# Ownership\n\nmoves and copies")
        .assert_record_count(1)
        .assert_record_linked("Ownership", "ownership.md")
        .assert_record_tags("Ownership", &["Rust", "基礎"])
        .assert_record_created_at("Ownership", "2024-05-01T10:00:00.000Z")
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_new_record_without_file() {
    Scenario::new("new_record_without_file")
        .bootstraps()
        .assert_ok()
        .wait_secs(90)
        .opens_new("Lifetimes")
        .submits()
        .assert_ok()
        .assert_notice_contains("Saved")
        .assert_record_unlinked("Lifetimes")
        .assert_record_created_at("Lifetimes", "2024-05-01T10:01:30.000Z")
        .assert_write_count(0)
        .run()
        .unwrap();
}

#[test]
fn test_empty_title_rejected() {
    Scenario::new("empty_title_rejected")
        .bootstraps()
        .assert_ok()
        .opens_new("   ")
        .submits()
        .assert_failed(ErrorKind::Rejected)
        .assert_state(SessionStateMatch::Drafting)
        .assert_record_count(0)
        .run()
        .unwrap();
}

#[test]
fn test_edit_existing_text_file() {
    Scenario::new("edit_existing_text_file")
        .with_remote_file("notes/rust.md", b"# Rust")
        .with_linked_record("Rust", "notes/rust.md")
        .bootstraps()
        .assert_ok()
        .opens_record("Rust")
        .assert_ok()
        .assert_state(SessionStateMatch::Drafting)
        .assert_preview(PreviewMatch::TextContains("# Rust".into()))
        .stages_text("# Rust\n\nownership")
        .assert_ok()
        .assert_state(SessionStateMatch::FileStaged)
        .assert_staged("notes/rust.md")
        .assert_preview(PreviewMatch::TextContains("ownership".into()))
        .submits()
        .assert_ok()
        .assert_state(SessionStateMatch::Committed)
        .assert_remote_file("notes/rust.md", b"# Rust\n\nownership")
        .assert_record_linked("Rust", "notes/rust.md")
        .assert_write_count(2)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_spreadsheet_cell_edit() {
    Scenario::new("spreadsheet_cell_edit")
        .with_remote_file("data/scores.csv", b"name,score\nalice,90\n")
        .with_linked_record("Scores", "data/scores.csv")
        .bootstraps()
        .assert_ok()
        .opens_record("Scores")
        .assert_ok()
        .assert_preview(PreviewMatch::Spreadsheet { sheets: 1 })
        .sets_cell(1, 1, "95")
        .assert_ok()
        .assert_staged("data/scores.csv")
        .submits()
        .assert_ok()
        .assert_remote_file("data/scores.csv", b"name,score\nalice,95\n")
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_set_cell_without_spreadsheet() {
    Scenario::new("set_cell_without_spreadsheet")
        .with_remote_file("notes/rust.md", b"# Rust")
        .with_linked_record("Rust", "notes/rust.md")
        .bootstraps()
        .assert_ok()
        .opens_record("Rust")
        .sets_cell(0, 0, "x")
        .assert_failed(ErrorKind::Rejected)
        .assert_nothing_staged()
        .run()
        .unwrap();
}

#[test]
fn test_later_upload_replaces_staged_edit() {
    Scenario::new("later_upload_replaces_staged_edit")
        .bootstraps()
        .assert_ok()
        .opens_new("Notes")
        .uploads("first.md", b"first")
        .uploads("second.md", b"second")
        .assert_staged("second.md")
        .submits()
        .assert_ok()
        .assert_remote_missing("first.md")
        .assert_record_linked("Notes", "second.md")
        .run()
        .unwrap();
}

#[test]
fn test_cancel_discards_everything() {
    Scenario::new("cancel_discards_everything")
        .bootstraps()
        .assert_ok()
        .opens_new("Ownership")
        .uploads("ownership.md", b"# Ownership")
        .assert_state(SessionStateMatch::FileStaged)
        .cancels()
        .assert_ok()
        .assert_no_session()
        .assert_nothing_staged()
        .assert_preview(PreviewMatch::None)
        .assert_write_count(0)
        .assert_record_count(0)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_missing_file_previews_as_missing() {
    Scenario::new("missing_file_previews_as_missing")
        .with_linked_record("Gone", "notes/gone.md")
        .bootstraps()
        .assert_ok()
        .opens_record("Gone")
        .assert_ok()
        .assert_state(SessionStateMatch::Drafting)
        .assert_preview(PreviewMatch::Missing)
        // The record fields stay editable
        .sets_tags(&["archived"])
        .submits()
        .assert_ok()
        .assert_record_tags("Gone", &["archived"])
        .run()
        .unwrap();
}

#[test]
fn test_pinned_view_is_read_only() {
    Scenario::new("pinned_view_is_read_only")
        .with_remote_file("notes/rust.md", b"first draft")
        .external_write("notes/rust.md", b"second draft")
        .views_file_at("notes/rust.md", 0)
        .assert_ok()
        .assert_viewed_read_only(true)
        .assert_preview(PreviewMatch::TextContains("first draft".into()))
        .views_file("notes/rust.md")
        .assert_ok()
        .assert_viewed_read_only(false)
        .assert_preview(PreviewMatch::TextContains("second draft".into()))
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_view_missing_file() {
    Scenario::new("view_missing_file")
        .views_file("notes/nothing.md")
        .assert_failed(ErrorKind::NotFound)
        .run()
        .unwrap();
}

#[test]
fn test_image_is_unsupported() {
    Scenario::new("image_is_unsupported")
        .with_remote_file("img/diagram.png", &[0x89, b'P', b'N', b'G', 0x0d, 0x0a])
        .bootstraps()
        .assert_ok()
        .opens_new("Diagram")
        .opens_remote_file("img/diagram.png")
        .assert_ok()
        .assert_preview(PreviewMatch::Unsupported(ContentCategory::Image))
        .stages_text("not an image")
        .assert_failed(ErrorKind::ParseFailure)
        .assert_nothing_staged()
        // Linking without editing is still allowed
        .submits()
        .assert_ok()
        .assert_write_count(1)
        .run()
        .unwrap();
}

#[test]
fn test_invalid_utf8_text_previews_error() {
    Scenario::new("invalid_utf8_text_previews_error")
        .with_remote_file("notes/broken.md", &[0xff, 0xfe, 0x00])
        .bootstraps()
        .assert_ok()
        .opens_new("Broken")
        .opens_remote_file("notes/broken.md")
        .assert_ok()
        .assert_preview(PreviewMatch::Error(ErrorKind::ParseFailure))
        .run()
        .unwrap();
}
