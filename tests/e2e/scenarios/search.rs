use crate::harness::Scenario;
use learnvault_core::SortOrder;

fn catalog(name: &str) -> Scenario {
    Scenario::new(name)
        .with_category("言語")
        .with_category("インフラ")
        .with_record("Goroutines", &["Go基礎"], Some("言語"))
        .with_record("Channels", &["Go基礎", "並行"], Some("言語"))
        .with_record("Ownership", &["Rust"], Some("言語"))
        .with_record("Docker networks", &[], Some("インフラ"))
        .with_record_text("Lifetimes", "rules the borrow checker enforces")
        .with_remote_file("go/goroutines.md", b"# Goroutines")
        .with_remote_file("rust/ownership.md", b"# Ownership")
        .bootstraps()
        .assert_ok()
}

#[test]
fn test_tag_filter() {
    catalog("tag_filter")
        .applies_filters(&["Go基礎"], "*", SortOrder::NameAsc)
        .assert_filter_summary("Filters applied: tags [Go基礎], category all, sort name-asc")
        .queries("")
        .assert_titles(&["Channels", "Goroutines"])
        .assert_record_message("2 results")
        .assert_file_message("0 results")
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_every_tag_must_match() {
    catalog("every_tag_must_match")
        .applies_filters(&["Go基礎", "並行"], "*", SortOrder::NameAsc)
        .queries("")
        .assert_titles(&["Channels"])
        .assert_record_message("1 result")
        .run()
        .unwrap();
}

#[test]
fn test_descending_is_reverse_of_ascending() {
    catalog("descending_is_reverse_of_ascending")
        .applies_filters(&[], "言語", SortOrder::NameAsc)
        .queries("")
        .assert_titles(&["Channels", "Goroutines", "Ownership"])
        .applies_filters(&[], "言語", SortOrder::NameDesc)
        .assert_filter_summary("Filters applied: tags [none], category 言語, sort name-desc")
        .queries("")
        .assert_titles(&["Ownership", "Goroutines", "Channels"])
        .run()
        .unwrap();
}

#[test]
fn test_no_match_reports_zero_results() {
    catalog("no_match_reports_zero_results")
        .queries("ない")
        .assert_titles(&[])
        .assert_files(&[])
        .assert_record_message("0 results")
        .assert_file_message("0 results")
        .run()
        .unwrap();
}

#[test]
fn test_freeform_matches_title_text_and_paths() {
    catalog("freeform_matches_title_text_and_paths")
        .queries("  GO ")
        .assert_titles(&["Goroutines"])
        .assert_files(&["go/goroutines.md"])
        .assert_file_message("1 result")
        .queries("BORROW")
        .assert_titles(&["Lifetimes"])
        .assert_files(&[])
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_category_filter_combines_with_query() {
    catalog("category_filter_combines_with_query")
        .applies_filters(&[], "インフラ", SortOrder::NameAsc)
        .queries("")
        .assert_titles(&["Docker networks"])
        .queries("ownership")
        .assert_titles(&[])
        // The path section ignores record filters
        .assert_files(&["rust/ownership.md"])
        .run()
        .unwrap();
}

#[test]
fn test_filters_persist_until_replaced() {
    catalog("filters_persist_until_replaced")
        .applies_filters(&["Rust"], "*", SortOrder::NameAsc)
        .queries("")
        .assert_titles(&["Ownership"])
        .queries("own")
        .assert_titles(&["Ownership"])
        .applies_filters(&[], "*", SortOrder::NameAsc)
        .queries("")
        .assert_record_message("5 results")
        .run()
        .unwrap();
}

#[test]
fn test_saved_record_is_searchable() {
    catalog("saved_record_is_searchable")
        .opens_new("Goroutine leaks")
        .sets_tags(&["Go基礎"])
        .submits()
        .assert_ok()
        .applies_filters(&["Go基礎"], "*", SortOrder::NameAsc)
        .queries("goroutine")
        .assert_titles(&["Goroutine leaks", "Goroutines"])
        .run()
        .unwrap();
}
