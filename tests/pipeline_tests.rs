//! Integration tests for the conversion pipeline.
//!
//! Tests cover:
//! - Idempotent reruns and change detection
//! - Atomic output writes
//! - Dry runs, existing outputs and forced reconversion
//! - Cache invalidation on failure
//! - Renaming media sets

use nfo2vsmeta::codec;
use nfo2vsmeta::core::cache::CacheStore;
use nfo2vsmeta::core::pipeline::Pipeline;
use nfo2vsmeta::models::cache::FingerprintStrategy;
use nfo2vsmeta::models::config::Config;
use nfo2vsmeta::models::outcome::{ConversionStatus, RenameOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn movie_nfo(title: &str, year: u32) -> String {
    format!(
        "<movie><title>{}</title><year>{}</year><rating>4.5</rating><genre>Drama</genre></movie>",
        title, year
    )
}

/// Library with one movie folder; returns (temp dir, library root, nfo path).
fn library(stem: &str, title: &str) -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("library");
    let dir = root.join("Movies").join(title);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.mkv", stem)), "fake video").unwrap();
    let nfo = dir.join(format!("{}.nfo", stem));
    fs::write(&nfo, movie_nfo(title, 2020)).unwrap();
    let root = fs::canonicalize(&root).unwrap();
    let nfo = fs::canonicalize(&nfo).unwrap();
    (temp_dir, root, nfo)
}

fn pipeline(root: &Path, configure: impl FnOnce(&mut Config)) -> Pipeline {
    let mut config = Config {
        scan_root: root.to_path_buf(),
        ..Default::default()
    };
    configure(&mut config);
    Pipeline::new(config).unwrap()
}

fn store(temp_dir: &TempDir) -> CacheStore {
    CacheStore::new(temp_dir.path().join("cache.json"), FingerprintStrategy::Content)
}

fn skip_reason(status: &ConversionStatus) -> Option<&str> {
    match status {
        ConversionStatus::Skipped { reason } => Some(reason),
        _ => None,
    }
}

// ========== CONVERSION TESTS ==========

#[test]
fn test_convert_writes_sidecar_next_to_media() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    let pipeline = pipeline(&root, |_| {});
    let mut cache = store(&temp_dir);

    let outcome = pipeline.convert_one(&nfo, &mut cache);

    assert!(outcome.is_converted(), "{:?}", outcome);
    let output = nfo.with_file_name("Foo.mkv.vsmeta");
    assert_eq!(outcome.output_path.as_deref(), Some(output.as_path()));

    let record = codec::decode(&fs::read(&output).unwrap()).unwrap();
    let model = record.to_model().unwrap();
    assert_eq!(model.title, "Foo");
    assert_eq!(model.year, 2020);
    assert_eq!(model.rating, Some(9.0));
    assert_eq!(model.genres, vec!["Drama"]);

    let entry = cache.get(&nfo).unwrap();
    assert_eq!(entry.output_path, output);
}

#[test]
fn test_rerun_is_idempotent() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    let pipeline = pipeline(&root, |_| {});
    let mut cache = store(&temp_dir);

    assert!(pipeline.convert_one(&nfo, &mut cache).is_converted());
    let output = nfo.with_file_name("Foo.mkv.vsmeta");
    let first = fs::read(&output).unwrap();

    let second = pipeline.convert_one(&nfo, &mut cache);
    assert_eq!(skip_reason(&second.status), Some("up-to-date"));
    assert_eq!(fs::read(&output).unwrap(), first);
}

#[test]
fn test_only_edited_source_is_reconverted() {
    let (temp_dir, root, foo) = library("Foo", "Foo");
    let bar_dir = root.join("Movies").join("Bar");
    fs::create_dir_all(&bar_dir).unwrap();
    fs::write(bar_dir.join("Bar.mkv"), "fake").unwrap();
    let bar = bar_dir.join("Bar.nfo");
    fs::write(&bar, movie_nfo("Bar", 2001)).unwrap();

    let pipeline = pipeline(&root, |_| {});
    let mut cache = store(&temp_dir);
    assert!(pipeline.convert_one(&foo, &mut cache).is_converted());
    assert!(pipeline.convert_one(&bar, &mut cache).is_converted());

    fs::write(&foo, movie_nfo("Foo Edited", 2020)).unwrap();

    assert!(pipeline.convert_one(&foo, &mut cache).is_converted());
    assert!(pipeline.convert_one(&bar, &mut cache).is_skipped());

    let output = fs::read(foo.with_file_name("Foo.mkv.vsmeta")).unwrap();
    let model = codec::decode(&output).unwrap().to_model().unwrap();
    assert_eq!(model.title, "Foo Edited");
}

#[test]
fn test_deleted_output_is_regenerated() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    let pipeline = pipeline(&root, |_| {});
    let mut cache = store(&temp_dir);

    pipeline.convert_one(&nfo, &mut cache);
    let output = nfo.with_file_name("Foo.mkv.vsmeta");
    fs::remove_file(&output).unwrap();

    assert!(pipeline.convert_one(&nfo, &mut cache).is_converted());
    assert!(output.exists());
}

#[test]
fn test_artwork_is_embedded() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    fs::write(nfo.with_file_name("Foo-poster.jpg"), b"poster bytes").unwrap();
    fs::write(nfo.with_file_name("fanart.jpg"), b"fanart bytes").unwrap();
    let pipeline = pipeline(&root, |_| {});
    let mut cache = store(&temp_dir);

    assert!(pipeline.convert_one(&nfo, &mut cache).is_converted());

    let record = codec::decode(&fs::read(nfo.with_file_name("Foo.mkv.vsmeta")).unwrap()).unwrap();
    record.verify_checksums().unwrap();
    let model = record.to_model().unwrap();
    assert_eq!(model.poster.unwrap().bytes(), Some(&b"poster bytes"[..]));
    assert_eq!(model.backdrop.unwrap().bytes(), Some(&b"fanart bytes"[..]));
}

#[test]
fn test_output_dir_mirrors_library_layout() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    let out = temp_dir.path().join("out");
    let pipeline = pipeline(&root, |c| c.output_dir = Some(out.clone()));
    let mut cache = store(&temp_dir);

    assert!(pipeline.convert_one(&nfo, &mut cache).is_converted());
    assert!(out.join("Movies/Foo/Foo.mkv.vsmeta").is_file());
    assert!(!nfo.with_file_name("Foo.mkv.vsmeta").exists());
}

// ========== FAILURE TESTS ==========

#[test]
fn test_failed_write_leaves_no_partial_output() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    let output = nfo.with_file_name("Foo.mkv.vsmeta");
    fs::create_dir(&output).unwrap();
    let pipeline = pipeline(&root, |c| c.skip_existing = false);
    let mut cache = store(&temp_dir);

    let outcome = pipeline.convert_one(&nfo, &mut cache);

    assert!(outcome.is_failed(), "{:?}", outcome);
    assert!(output.is_dir());
    let leftovers: Vec<_> = fs::read_dir(nfo.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    assert!(cache.is_empty());
}

#[test]
fn test_malformed_source_invalidates_cache_entry() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    let pipeline = pipeline(&root, |_| {});
    let mut cache = store(&temp_dir);
    assert!(pipeline.convert_one(&nfo, &mut cache).is_converted());

    fs::write(&nfo, "<movie><title>Broken</movie>").unwrap();
    let outcome = pipeline.convert_one(&nfo, &mut cache);
    match &outcome.status {
        ConversionStatus::Failed { error } => assert!(error.contains("Malformed"), "{}", error),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(cache.get(&nfo).unwrap().is_invalidated());

    fs::write(&nfo, movie_nfo("Fixed", 2020)).unwrap();
    assert!(pipeline.convert_one(&nfo, &mut cache).is_converted());
    assert!(!cache.get(&nfo).unwrap().is_invalidated());
}

#[test]
fn test_missing_source_fails() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    let pipeline = pipeline(&root, |_| {});
    let mut cache = store(&temp_dir);

    let outcome = pipeline.convert_one(&nfo.with_file_name("Missing.nfo"), &mut cache);
    assert!(outcome.is_failed());
    assert!(cache.is_empty());
}

// ========== MODE TESTS ==========

#[test]
fn test_dry_run_writes_nothing() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    let pipeline = pipeline(&root, |c| c.dry_run = true);
    let mut cache = store(&temp_dir);

    let outcome = pipeline.convert_one(&nfo, &mut cache);

    assert!(outcome.is_converted());
    assert!(outcome.dry_run);
    assert!(!nfo.with_file_name("Foo.mkv.vsmeta").exists());
    assert!(cache.is_empty());
    assert!(!cache.is_dirty());
}

#[test]
fn test_existing_output_is_skipped_unless_forced() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    let output = nfo.with_file_name("Foo.mkv.vsmeta");
    fs::write(&output, b"hand made").unwrap();
    let mut cache = store(&temp_dir);

    let outcome = pipeline(&root, |_| {}).convert_one(&nfo, &mut cache);
    assert_eq!(skip_reason(&outcome.status), Some("output already exists"));
    assert_eq!(fs::read(&output).unwrap(), b"hand made");

    let outcome = pipeline(&root, |c| c.force = true).convert_one(&nfo, &mut cache);
    assert!(outcome.is_converted());
    assert!(codec::decode(&fs::read(&output).unwrap()).is_ok());
}

#[test]
fn test_dry_run_marks_skipped_and_failed_outcomes() {
    let (temp_dir, root, nfo) = library("Foo", "Foo");
    fs::write(nfo.with_file_name("Foo.mkv.vsmeta"), b"hand made").unwrap();
    let pipeline = pipeline(&root, |c| c.dry_run = true);
    let mut cache = store(&temp_dir);

    let skipped = pipeline.convert_one(&nfo, &mut cache);
    assert_eq!(skip_reason(&skipped.status), Some("output already exists"));
    assert!(skipped.dry_run);

    let failed = pipeline.convert_one(&nfo.with_file_name("missing.nfo"), &mut cache);
    assert!(failed.is_failed());
    assert!(failed.dry_run);
}

// ========== RENAME TESTS ==========

#[test]
fn test_rename_moves_media_set_and_cache_key() {
    let (temp_dir, root, nfo) = library("Some.Release.1080p", "Foo");
    let dir = nfo.parent().unwrap().to_path_buf();
    fs::write(dir.join("Some.Release.1080p.en.srt"), "subs").unwrap();
    fs::write(dir.join("unrelated.txt"), "keep").unwrap();
    let pipeline = pipeline(&root, |c| c.rename_enabled = true);
    let mut cache = store(&temp_dir);

    let outcome = pipeline.convert_one(&nfo, &mut cache);

    assert!(outcome.is_converted(), "{:?}", outcome);
    assert!(matches!(outcome.rename, Some(RenameOutcome::Renamed { .. })));
    for name in ["Foo (2020).mkv", "Foo (2020).nfo", "Foo (2020).en.srt", "Foo (2020).mkv.vsmeta", "unrelated.txt"] {
        assert!(dir.join(name).is_file(), "missing {}", name);
    }
    assert!(!nfo.exists());

    let new_nfo = dir.join("Foo (2020).nfo");
    assert!(cache.get(&nfo).is_none());
    assert_eq!(cache.get(&new_nfo).unwrap().output_path, dir.join("Foo (2020).mkv.vsmeta"));

    // The renamed set is fresh on the next run.
    let again = pipeline.convert_one(&new_nfo, &mut cache);
    assert!(again.is_skipped());
}

#[test]
fn test_rename_dry_run_only_plans() {
    let (temp_dir, root, nfo) = library("Some.Release.1080p", "Foo");
    let pipeline = pipeline(&root, |c| {
        c.rename_enabled = true;
        c.dry_run = true;
    });
    let mut cache = store(&temp_dir);

    let outcome = pipeline.convert_one(&nfo, &mut cache);

    match outcome.rename {
        Some(RenameOutcome::Planned { ref to, .. }) => {
            assert_eq!(to.file_name().unwrap(), "Foo (2020).mkv")
        }
        ref other => panic!("expected planned rename, got {:?}", other),
    }
    assert!(nfo.exists());
    assert!(nfo.with_file_name("Some.Release.1080p.mkv").exists());
}

#[test]
fn test_well_formed_name_is_left_alone() {
    let (temp_dir, root, nfo) = library("Foo (2020)", "Foo");
    let pipeline = pipeline(&root, |c| c.rename_enabled = true);
    let mut cache = store(&temp_dir);

    let outcome = pipeline.convert_one(&nfo, &mut cache);
    assert_eq!(outcome.rename, Some(RenameOutcome::WellFormed));
}

#[test]
fn test_rename_conflict_keeps_original_names() {
    let (temp_dir, root, nfo) = library("Some.Release.1080p", "Foo");
    let dir = nfo.parent().unwrap().to_path_buf();
    fs::write(dir.join("Foo (2020).nfo"), "someone else's").unwrap();
    let pipeline = pipeline(&root, |c| c.rename_enabled = true);
    let mut cache = store(&temp_dir);

    let outcome = pipeline.convert_one(&nfo, &mut cache);

    assert!(outcome.is_converted());
    assert!(matches!(outcome.rename, Some(RenameOutcome::Failed { .. })));
    assert!(nfo.exists());
    assert!(dir.join("Some.Release.1080p.mkv").exists());
    assert!(dir.join("Some.Release.1080p.mkv.vsmeta").exists());
    assert_eq!(fs::read_to_string(dir.join("Foo (2020).nfo")).unwrap(), "someone else's");
    assert!(cache.get(&nfo).is_some());
}

#[test]
fn test_rename_dry_run_reports_conflict() {
    let (temp_dir, root, nfo) = library("Some.Release.1080p", "Foo");
    let dir = nfo.parent().unwrap().to_path_buf();
    fs::write(dir.join("Foo (2020).nfo"), "someone else's").unwrap();
    let pipeline = pipeline(&root, |c| {
        c.rename_enabled = true;
        c.dry_run = true;
    });
    let mut cache = store(&temp_dir);

    let outcome = pipeline.convert_one(&nfo, &mut cache);

    match outcome.rename {
        Some(RenameOutcome::Failed { ref error }) => assert!(error.contains("Foo (2020).nfo"), "{}", error),
        ref other => panic!("expected failed rename, got {:?}", other),
    }
    assert!(nfo.exists());
    assert!(dir.join("Some.Release.1080p.mkv").exists());
    assert!(!dir.join("Foo (2020).mkv").exists());
}

#[test]
fn test_rename_leaves_movies_sharing_a_prefix_alone() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("library");
    fs::create_dir_all(&root).unwrap();
    let root = fs::canonicalize(&root).unwrap();
    for name in ["Alien.mkv", "Alien.Resurrection.mkv", "Alien-Covenant.mkv", "Alien-poster.jpg", "Alien.en.srt"] {
        fs::write(root.join(name), "fake").unwrap();
    }
    fs::write(root.join("Alien.nfo"), movie_nfo("Alien", 1979)).unwrap();
    fs::write(root.join("Alien.Resurrection.nfo"), movie_nfo("Alien Resurrection", 1997)).unwrap();
    let pipeline = pipeline(&root, |c| c.rename_enabled = true);
    let mut cache = store(&temp_dir);

    let outcome = pipeline.convert_one(&root.join("Alien.nfo"), &mut cache);

    assert!(matches!(outcome.rename, Some(RenameOutcome::Renamed { .. })), "{:?}", outcome);
    let mut names: Vec<String> = fs::read_dir(&root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "Alien (1979)-poster.jpg",
            "Alien (1979).en.srt",
            "Alien (1979).mkv",
            "Alien (1979).mkv.vsmeta",
            "Alien (1979).nfo",
            "Alien-Covenant.mkv",
            "Alien.Resurrection.mkv",
            "Alien.Resurrection.nfo",
        ]
    );
    assert!(cache.get(&root.join("Alien (1979).nfo")).is_some());
}
