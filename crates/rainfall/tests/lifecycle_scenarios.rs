use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgb, RgbImage};
use rainfall::{
    ArtifactLifecycleManager, BlobId, BlobStore, ErrorCategory, FsBlobStore, MemoryBlobStore, Pipeline,
    RainAreaCollection, RainfallError, Result, RunStatus, StagedRun, process_image,
};

const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
const GREY: Rgb<u8> = Rgb([90, 90, 90]);

/// Archive that rejects every write
struct FailingBlobStore;

impl BlobStore for FailingBlobStore {
    fn put(&self, _bytes: &[u8], key: &str) -> Result<BlobId> {
        Err(RainfallError::Archival(format!("{}: archive unavailable", key)))
    }

    fn exists(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        Err(RainfallError::BlobNotFound(key.to_string()))
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

fn save_image(dir: &Path, name: &str, color: Rgb<u8>) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(4, 3, color).save(&path).expect("save png");
    path
}

/// Visible artifact files in the slot
fn slot_contents(slot: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(slot)
        .expect("slot exists")
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    names
}

#[test]
fn first_upload_fills_empty_slot_without_archiving() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(MemoryBlobStore::new());
    let lifecycle = ArtifactLifecycleManager::new(dir.path().join("current"), store.clone());
    let image = save_image(dir.path(), "radar_a.png", GREEN);

    let report = process_image(&Pipeline::builder().build(), &lifecycle, &dir.path().join("staging"), &image)
        .expect("processes");

    assert_eq!(report.status, RunStatus::FeaturesFound);
    assert_eq!(report.feature_count, 4 * 3 * 2);
    assert_eq!(slot_contents(&dir.path().join("current")), vec!["radar_a_areas.geojson"]);
    assert_eq!(store.put_count(), 0);
}

#[test]
fn second_upload_archives_the_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let slot = dir.path().join("current");
    let archive = dir.path().join("archive");
    let lifecycle = ArtifactLifecycleManager::new(&slot, Arc::new(FsBlobStore::new(&archive)));
    let pipeline = Pipeline::builder().build();
    let staging = dir.path().join("staging");

    let first = process_image(&pipeline, &lifecycle, &staging, &save_image(dir.path(), "a.png", GREEN))
        .expect("first run");
    let first_bytes = fs::read(&first.artifact).expect("readable");

    process_image(&pipeline, &lifecycle, &staging, &save_image(dir.path(), "b.png", GREY))
        .expect("second run");

    assert_eq!(slot_contents(&slot), vec!["b_areas.geojson"]);
    assert_eq!(lifecycle.archived("a_areas.geojson").expect("archived"), first_bytes);
    assert_eq!(fs::read(archive.join("a_areas.geojson")).expect("on disk"), first_bytes);
}

#[test]
fn out_of_band_image_installs_empty_artifact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let lifecycle = ArtifactLifecycleManager::new(dir.path().join("current"), Arc::new(MemoryBlobStore::new()));
    let image = save_image(dir.path(), "clear_sky.png", GREY);

    let report = process_image(&Pipeline::builder().build(), &lifecycle, &dir.path().join("staging"), &image)
        .expect("processes");

    assert_eq!(report.status, RunStatus::NoFeaturesFound);
    assert_eq!(report.feature_count, 0);
    let installed = RainAreaCollection::from_geojson_file(&report.artifact).expect("readable");
    assert!(installed.is_empty());
    assert_eq!(lifecycle.current().unwrap(), Some(report.artifact));
}

#[test]
fn archival_failure_leaves_slot_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let slot = dir.path().join("current");
    let staging = dir.path().join("staging");
    let pipeline = Pipeline::builder().build();

    let healthy = ArtifactLifecycleManager::new(&slot, Arc::new(MemoryBlobStore::new()));
    let first = process_image(&pipeline, &healthy, &staging, &save_image(dir.path(), "a.png", GREEN))
        .expect("first run");
    let first_bytes = fs::read(&first.artifact).expect("readable");

    let broken = ArtifactLifecycleManager::new(&slot, Arc::new(FailingBlobStore));
    let staged = StagedRun::stage(&pipeline, &staging, &save_image(dir.path(), "b.png", GREEN)).expect("stages");
    let err = staged.install(&broken).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Archival);
    assert_eq!(slot_contents(&slot), vec!["a_areas.geojson"]);
    assert_eq!(fs::read(&first.artifact).expect("still there"), first_bytes);
    // The new artifact is kept outside the slot so the install can be retried
    assert!(staged.pending.path.is_file());

    let report = staged.install(&healthy).expect("retry succeeds");
    assert_eq!(slot_contents(&slot), vec!["b_areas.geojson"]);
    assert_eq!(healthy.archived("a_areas.geojson").expect("archived"), first_bytes);
    assert_eq!(report.artifact, slot.join("b_areas.geojson"));
}

#[test]
fn reprocessing_same_image_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let slot = dir.path().join("current");
    let store = Arc::new(MemoryBlobStore::new());
    let lifecycle = ArtifactLifecycleManager::new(&slot, store.clone());
    let pipeline = Pipeline::builder().build();
    let staging = dir.path().join("staging");
    let image = save_image(dir.path(), "radar.png", GREEN);

    let first = process_image(&pipeline, &lifecycle, &staging, &image).expect("first run");
    let first_bytes = fs::read(&first.artifact).expect("readable");
    let second = process_image(&pipeline, &lifecycle, &staging, &image).expect("second run");

    assert_eq!(first.artifact, second.artifact);
    assert_eq!(fs::read(&second.artifact).expect("readable"), first_bytes);
    assert_eq!(slot_contents(&slot), vec!["radar_areas.geojson"]);
    assert_eq!(store.keys().unwrap(), vec!["radar_areas.geojson".to_string()]);
}

#[test]
fn slot_holds_one_artifact_after_every_install() {
    let dir = tempfile::tempdir().expect("tempdir");
    let slot = dir.path().join("current");
    let store = Arc::new(MemoryBlobStore::new());
    let lifecycle = ArtifactLifecycleManager::new(&slot, store.clone());
    let pipeline = Pipeline::builder().build();
    let staging = dir.path().join("staging");

    let names = ["t0", "t1", "t0", "t2", "t3"];
    for (i, name) in names.iter().enumerate() {
        let color = if i % 2 == 0 { GREEN } else { GREY };
        let image = save_image(dir.path(), &format!("{}.png", name), color);
        let report = process_image(&pipeline, &lifecycle, &staging, &image).expect("processes");

        assert_eq!(slot_contents(&slot), vec![format!("{}_areas.geojson", name)]);
        assert_eq!(lifecycle.current().unwrap(), Some(report.artifact));
    }

    // Every superseded name was archived exactly once
    assert_eq!(
        store.keys().unwrap(),
        vec!["t0_areas.geojson", "t1_areas.geojson", "t2_areas.geojson"]
    );

    // Run directories are cleaned up after successful installs
    let leftovers = fs::read_dir(&staging).expect("staging exists").count();
    assert_eq!(leftovers, 0);
}

#[test]
fn invalid_image_never_reaches_the_slot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let slot = dir.path().join("current");
    let lifecycle = ArtifactLifecycleManager::new(&slot, Arc::new(MemoryBlobStore::new()));
    let broken = dir.path().join("broken.png");
    fs::write(&broken, b"").expect("write");

    let err = process_image(&Pipeline::builder().build(), &lifecycle, &dir.path().join("staging"), &broken)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidImage);
    assert_eq!(lifecycle.current().unwrap(), None);
}

#[test]
fn managers_sharing_a_slot_take_turns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let slot = dir.path().join("current");
    let archive = dir.path().join("archive");
    let first = ArtifactLifecycleManager::new(&slot, Arc::new(FsBlobStore::new(&archive)));
    let second = ArtifactLifecycleManager::new(&slot, Arc::new(FsBlobStore::new(&archive)));

    let artifact = |run: String, name: String| {
        let path = dir.path().join(run).join(name);
        fs::create_dir_all(path.parent().unwrap()).expect("run dir");
        fs::write(&path, b"{}").expect("write artifact");
        path
    };

    for round in 0..50 {
        let x = artifact(format!("x{round}"), format!("x{round}_areas.geojson"));
        let y = artifact(format!("y{round}"), format!("y{round}_areas.geojson"));

        std::thread::scope(|s| {
            let a = s.spawn(|| first.install(&x));
            let b = s.spawn(|| second.install(&y));
            a.join().expect("thread").expect("first install");
            b.join().expect("thread").expect("second install");
        });

        assert_eq!(slot_contents(&slot).len(), 1, "round {round}");
    }

    // Every artifact but the last installed one went to the archive
    let archived = FsBlobStore::new(&archive).keys().expect("keys");
    assert_eq!(archived.len(), 99);
}
