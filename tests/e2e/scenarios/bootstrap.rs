use crate::harness::{Assertion, Scenario};
use learnvault_core::{CatalogEndpoint, ErrorKind, Vault};

#[test]
fn test_bootstrap_loads_catalog_and_listing() {
    Scenario::new("bootstrap_loads_catalog_and_listing")
        .with_remote_file("notes/rust.md", b"# Rust")
        .with_category("言語")
        .with_record("Ownership", &["Rust"], Some("言語"))
        .with_record("Borrowing", &["Rust"], Some("言語"))
        .bootstraps()
        .assert_ok()
        .assert_listed("notes/rust.md")
        .queries("")
        .assert_titles(&["Borrowing", "Ownership"])
        .assert_record_message("2 results")
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_partial_join_shows_empty_catalog() {
    Scenario::new("partial_join_shows_empty_catalog")
        .with_category("言語")
        .with_record("Ownership", &["Rust"], Some("言語"))
        .catalog_fails(CatalogEndpoint::ListTags)
        .bootstraps()
        .assert_failed(ErrorKind::PartialJoinFailure)
        .queries("")
        .assert_titles(&[])
        .assert_record_message("0 results")
        // Reload once the catalog is back
        .catalog_recovers(CatalogEndpoint::ListTags)
        .reloads()
        .assert_ok()
        .queries("")
        .assert_titles(&["Ownership"])
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_partial_join_after_successful_load() {
    // A failed reload drops the previously loaded records too
    Scenario::new("partial_join_after_successful_load")
        .with_record("Ownership", &[], None)
        .bootstraps()
        .assert_ok()
        .catalog_fails(CatalogEndpoint::ListCategories)
        .reloads()
        .assert_failed_with("categories")
        .queries("")
        .assert_record_message("0 results")
        .run()
        .unwrap();
}

#[test]
fn test_listing_failure_does_not_fail_bootstrap() {
    Scenario::new("listing_failure_does_not_fail_bootstrap")
        .with_remote_file("notes/rust.md", b"# Rust")
        .with_record("Ownership", &[], None)
        .next_list_fails(503)
        .bootstraps()
        .assert_ok()
        .assert_not_listed("notes/rust.md")
        .queries("")
        .assert_titles(&["Ownership"])
        .refreshes_listing()
        .assert_ok()
        .assert_listed("notes/rust.md")
        .run()
        .unwrap();
}

#[test]
fn test_listing_failure_keeps_previous_listing() {
    Scenario::new("listing_failure_keeps_previous_listing")
        .with_remote_file("a.md", b"a")
        .bootstraps()
        .assert_ok()
        .assert_listed("a.md")
        .external_write("b.md", b"b")
        .next_list_fails(500)
        .refreshes_listing()
        .assert_failed(ErrorKind::TransportFailure)
        .assert_listed("a.md")
        .assert_not_listed("b.md")
        .refreshes_listing()
        .assert_ok()
        .assert_listed("b.md")
        .run()
        .unwrap();
}

#[test]
fn test_listing_refreshed_after_upload_delay() {
    Scenario::new("listing_refreshed_after_upload_delay")
        .bootstraps()
        .assert_ok()
        .opens_new("Notes")
        .uploads("notes.md", b"# Notes")
        .assert_ok()
        .submits()
        .assert_ok()
        .assert_remote_file("notes.md", b"# Notes")
        .assert_not_listed("notes.md")
        .wait_secs(1)
        .assert_not_listed("notes.md")
        .wait_secs(3)
        .assert_listed("notes.md")
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_delete_record_reloads_catalog() {
    Scenario::new("delete_record_reloads_catalog")
        .with_record("Ownership", &["Rust"], None)
        .with_record("Borrowing", &["Rust"], None)
        .bootstraps()
        .assert_ok()
        .deletes_record("Ownership")
        .assert_ok()
        .assert_record_count(1)
        .queries("")
        .assert_titles(&["Borrowing"])
        .run()
        .unwrap();
}

#[test]
fn test_delete_failure_keeps_record() {
    Scenario::new("delete_failure_keeps_record")
        .with_record("Ownership", &[], None)
        .bootstraps()
        .assert_ok()
        .catalog_fails(CatalogEndpoint::DeleteRecord)
        .deletes_record("Ownership")
        .assert_failed(ErrorKind::TransportFailure)
        .assert_record_count(1)
        .run()
        .unwrap();
}

#[test]
fn test_create_category() {
    Scenario::new("create_category")
        .with_category("言語")
        .bootstraps()
        .assert_ok()
        .creates_category("  データベース ")
        .assert_ok()
        .assert(Assertion::Custom(Box::new(|vault: &Vault| {
            anyhow::ensure!(
                vault.snapshot().category_id("データベース").is_some(),
                "new category missing from the snapshot"
            );
            Ok(())
        })))
        .creates_category("言語")
        .assert_failed_with("already exists")
        .creates_category("   ")
        .assert_failed(ErrorKind::Rejected)
        .run()
        .expect("scenario should pass");
}
