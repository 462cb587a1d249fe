//! End-to-end runs against a real converter process (a shell script
//! honouring the converter's argument grammar).

#![cfg(unix)]

mod common;

use std::path::Path;

use common::{cookies, variant, TestHarness};
use mediaconv::db::job_repo;
use mediaconv::{
    CatalogError, CredentialStager, DispatchError, Dispatcher, JobState, ProcessConverter,
    Variant,
};

const SCRIPT: &str = r#"#!/bin/sh
item="$1"; mode="$2"; root="$3"; shift 3
resolution=""; cookies=""
while [ $# -gt 0 ]; do
  case "$1" in
    --resolution) resolution="$2"; shift 2 ;;
    --cookies) cookies="$2"; shift 2 ;;
    *) shift ;;
  esac
done
if [ -n "$cookies" ]; then
  [ -f "$cookies" ] || { echo "ERROR: cookie file missing"; exit 2; }
fi
echo "[download] fetching $item"
if [ "$item" = "broken00000" ]; then
  echo "ERROR: Video unavailable"
  exit 0
fi
if [ "$mode" = "audio" ]; then
  out="$root/$item.mp3"
elif [ -z "$resolution" ]; then
  echo "['360p', '720p']"
  exit 0
else
  out="$root/$item-$resolution.mp4"
fi
echo media > "$out"
echo "$out"
"#;

fn process_dispatcher(harness: &TestHarness) -> Dispatcher {
    let script = harness.temp_path().join("converter.sh");
    std::fs::write(&script, SCRIPT).unwrap();
    let converter = ProcessConverter::new(
        "sh",
        vec![script.to_string_lossy().into_owned()],
    );
    Dispatcher::new(
        harness.db.clone(),
        std::sync::Arc::new(converter),
        &harness.store_dir,
        CredentialStager::new(&harness.staging_dir),
        2,
    )
    .unwrap()
}

#[test]
fn video_conversion_through_process() {
    let harness = TestHarness::new(&[]);
    let item = harness.seed_item("abc123");
    let dispatcher = process_dispatcher(&harness);

    dispatcher
        .dispatch(&item, &variant("720p"), Some(&cookies("# cookies")))
        .unwrap();
    dispatcher.join();

    let row = job_repo::find(&harness.db, &item, &variant("720p"))
        .unwrap()
        .unwrap();
    assert_eq!(row.state, JobState::Completed);
    let path = row.artifact_path.unwrap();
    assert_eq!(path, harness.store_dir.join("abc123-720p.mp4"));
    assert!(Path::new(&path).exists());
    assert_eq!(harness.staged_files(), 0);
}

#[test]
fn audio_conversion_through_process() {
    let harness = TestHarness::new(&[]);
    let item = harness.seed_item("abc123");
    let dispatcher = process_dispatcher(&harness);

    dispatcher.dispatch(&item, &Variant::audio(), None).unwrap();
    dispatcher.join();

    let row = job_repo::find(&harness.db, &item, &Variant::audio())
        .unwrap()
        .unwrap();
    assert_eq!(row.state, JobState::Completed);
    assert_eq!(row.artifact_path, Some(harness.store_dir.join("abc123.mp3")));
}

#[test]
fn reported_error_marks_job_failed() {
    let harness = TestHarness::new(&[]);
    let item = harness.seed_item("broken00000");
    let dispatcher = process_dispatcher(&harness);

    dispatcher.dispatch(&item, &Variant::audio(), None).unwrap();
    dispatcher.join();

    let row = job_repo::find(&harness.db, &item, &Variant::audio())
        .unwrap()
        .unwrap();
    assert_eq!(row.state, JobState::Failed);
    assert!(row.artifact_path.is_none());
}

#[test]
fn probe_error_rejects_dispatch() {
    let harness = TestHarness::new(&[]);
    let item = harness.seed_item("broken00000");
    let dispatcher = process_dispatcher(&harness);

    let err = dispatcher
        .dispatch(&item, &variant("720p"), None)
        .unwrap_err();
    dispatcher.join();

    assert!(matches!(err, DispatchError::Catalog(CatalogError::Conversion(_))));
    assert!(job_repo::list_by_item(&harness.db, &item).unwrap().is_empty());
}

#[test]
fn probe_lists_variants() {
    let harness = TestHarness::new(&[]);
    let item = harness.seed_item("abc123");
    let dispatcher = process_dispatcher(&harness);

    let variants = dispatcher
        .probe_variants(&item, Some(&cookies("# cookies")))
        .unwrap();
    dispatcher.join();

    let labels: Vec<&str> = variants.iter().map(Variant::as_str).collect();
    assert_eq!(labels, vec!["360p", "720p"]);
    assert_eq!(harness.staged_files(), 0);
}
