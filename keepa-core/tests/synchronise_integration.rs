use chrono::NaiveDate;
use keepa_core::contract::{MockObjectStore, ObjectSummary};
use keepa_core::synchronise::{retain_on, synchronise_on};
use keepa_core::{Entry, RetentionError};
use mockall::Sequence;
use std::fs;
use tempfile::tempdir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
}

#[tokio::test]
async fn test_synchronise_uploads_then_prunes_flagged_buckets() {
    let temp = tempdir().unwrap();
    let backups = temp.path().join("backups");
    let plain = temp.path().join("plain");
    fs::create_dir_all(&backups).unwrap();
    fs::create_dir_all(&plain).unwrap();
    fs::write(backups.join("db.sql"), b"dump").unwrap();
    fs::write(plain.join("notes.txt"), b"notes").unwrap();

    let mut dated = Entry::new(&backups, "backups-bucket");
    dated.archive_mode = true;
    dated.append_date = true;
    dated.date_handling = true;
    let entries = vec![dated, Entry::new(&plain, "plain-bucket")];

    let mut seq = Sequence::new();
    let mut store = MockObjectStore::new();
    store
        .expect_upload_file()
        .withf(|_, bucket: &str, key: &str| bucket == "backups-bucket" && key == "backups-14-10-2026.zip")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(()));
    store
        .expect_upload_file()
        .withf(|_, bucket: &str, key: &str| bucket == "plain-bucket" && key == "notes.txt")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(()));
    store
        .expect_list_objects()
        .withf(|bucket: &str| bucket == "backups-bucket")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(vec![
                ObjectSummary::new("backups-01-09-2026.zip"),
                ObjectSummary::new("backups-29-09-2026.zip"),
                ObjectSummary::new("backups-14-10-2026.zip"),
            ])
        });
    store
        .expect_delete_objects()
        .withf(|bucket: &str, keys: &[String]| {
            bucket == "backups-bucket" && keys == ["backups-01-09-2026.zip".to_string()]
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    let report = synchronise_on(&store, &entries, today())
        .await
        .expect("synchronise should succeed");

    assert_eq!(report.upload.uploaded.len(), 2);
    assert!(report.upload.failed.is_empty());
    assert_eq!(report.retention.len(), 1);
    assert_eq!(report.retention[0].bucket, "backups-bucket");
    assert_eq!(report.retention[0].deleted, vec!["backups-01-09-2026.zip"]);
}

#[tokio::test]
async fn test_upload_failures_do_not_prevent_retention() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("src");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.txt"), b"a").unwrap();

    let mut entry = Entry::new(&root, "bucket");
    entry.date_handling = true;

    let mut store = MockObjectStore::new();
    store
        .expect_upload_file()
        .returning(|_, _, _| Err("boom".into()));
    store
        .expect_list_objects()
        .times(1)
        .returning(|_| Ok(vec![]));
    store.expect_delete_objects().times(0);

    let report = synchronise_on(&store, &[entry], today()).await.unwrap();
    assert_eq!(report.upload.failed.len(), 1);
    assert_eq!(report.retention.len(), 1);
}

#[tokio::test]
async fn test_retention_failure_stops_remaining_buckets() {
    let temp = tempdir().unwrap();
    let mut first = Entry::new(temp.path(), "first");
    first.date_handling = true;
    let mut second = Entry::new(temp.path(), "second");
    second.date_handling = true;

    let mut store = MockObjectStore::new();
    store
        .expect_list_objects()
        .withf(|bucket: &str| bucket == "first")
        .times(1)
        .returning(|_| Err("no such bucket".into()));
    store
        .expect_list_objects()
        .withf(|bucket: &str| bucket == "second")
        .times(0);

    let err = retain_on(&store, &[first, second], today()).await.unwrap_err();
    assert!(matches!(err, RetentionError::List { ref bucket, .. } if bucket == "first"));
}

#[tokio::test]
async fn test_entries_without_date_handling_are_not_pruned() {
    let temp = tempdir().unwrap();
    let mut store = MockObjectStore::new();
    store.expect_list_objects().times(0);
    store.expect_delete_objects().times(0);

    let reports = retain_on(&store, &[Entry::new(temp.path(), "bucket")], today())
        .await
        .unwrap();
    assert!(reports.is_empty());
}
