//! Batch extraction: single-file and directory modes

mod common;

use appxtract_errors::UnpackError;
use appxtract_types::{publisher_id, ContainerKind};
use appxtract_unpack::ExtractOptions;
use common::{batch, touch, FakeContainer, FakeReader, PUBLISHER};

#[tokio::test]
async fn test_directory_of_non_containers_is_all_skipped() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    touch(source.path(), &["readme.txt", "setup.exe", "notes"]);
    std::fs::create_dir(source.path().join("nested")).unwrap();

    let outcome = batch(&FakeReader::new())
        .run(source.path(), dest.path(), &ExtractOptions::new())
        .await
        .unwrap();

    let mut expected: Vec<_> = std::fs::read_dir(source.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    expected.sort();

    assert!(outcome.failed.is_empty());
    assert!(outcome.extracted.is_empty());
    assert_eq!(outcome.skipped, expected);
}

#[tokio::test]
async fn test_corrupt_item_is_isolated() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    touch(source.path(), &["A.msix", "B.msix", "C.appx", "D.msixbundle"]);
    let reader = FakeReader::new()
        .with("A.msix", FakeContainer::package("Alpha"))
        .with("B.msix", FakeContainer::Corrupt { code: None })
        .with("C.appx", FakeContainer::package("Gamma"))
        .with("D.msixbundle", FakeContainer::suite_bundle(&["Main.appx"]));

    let outcome = batch(&reader)
        .run(source.path(), dest.path(), &ExtractOptions::new())
        .await
        .unwrap();

    assert_eq!(outcome.failure_count(), 1);
    assert!(!outcome.is_clean());
    let (failed_path, err) = &outcome.failed[0];
    assert_eq!(failed_path, &source.path().join("B.msix"));
    assert!(matches!(
        err,
        UnpackError::ContainerCorruptOrUnsigned { .. }
    ));

    let kinds: Vec<_> = outcome.extracted.iter().map(|item| item.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ContainerKind::Package,
            ContainerKind::Package,
            ContainerKind::Bundle
        ]
    );
    for item in &outcome.extracted {
        for folder in &item.folders {
            assert!(folder.join("AppxManifest.xml").is_file(), "{}", folder.display());
        }
    }
}

#[tokio::test]
async fn test_single_unrecognized_file_is_sole_failure() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    touch(source.path(), &["readme.txt"]);
    let file = source.path().join("readme.txt");

    let outcome = batch(&FakeReader::new())
        .run(&file, dest.path(), &ExtractOptions::new())
        .await
        .unwrap();

    assert!(outcome.skipped.is_empty());
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, file);
    assert!(matches!(
        outcome.failed[0].1,
        UnpackError::InvalidSource { .. }
    ));
}

#[tokio::test]
async fn test_single_failed_item_is_not_a_batch_error() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    touch(source.path(), &["Bad.msix"]);
    let reader = FakeReader::new().with("Bad.msix", FakeContainer::Corrupt { code: Some(3) });

    let outcome = batch(&reader)
        .run(&source.path().join("Bad.msix"), dest.path(), &ExtractOptions::new())
        .await
        .unwrap();

    assert_eq!(outcome.failure_count(), 1);
    assert!(outcome.extracted.is_empty());
}

#[tokio::test]
async fn test_single_package_file() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    touch(source.path(), &["App.MSIX"]);
    let reader = FakeReader::new().with("App.MSIX", FakeContainer::package("App"));

    let outcome = batch(&reader)
        .run(&source.path().join("App.MSIX"), dest.path(), &ExtractOptions::new())
        .await
        .unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.extracted.len(), 1);
    assert_eq!(
        outcome.extracted[0].full_name,
        format!("App_1.0.0.0_x64__{}", publisher_id(PUBLISHER))
    );
}

#[tokio::test]
async fn test_missing_source_is_batch_error() {
    let dest = tempfile::tempdir().unwrap();
    let missing = dest.path().join("does-not-exist");

    let err = batch(&FakeReader::new())
        .run(&missing, dest.path(), &ExtractOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, UnpackError::InvalidSource { .. }));
}

#[tokio::test]
async fn test_full_name_collision_fails_second_item() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    touch(source.path(), &["a-copy.msix", "b-copy.msix"]);
    let reader = FakeReader::new()
        .with("a-copy.msix", FakeContainer::package("App"))
        .with("b-copy.msix", FakeContainer::package("App"));

    let outcome = batch(&reader)
        .run(source.path(), dest.path(), &ExtractOptions::new())
        .await
        .unwrap();

    assert_eq!(outcome.extracted.len(), 1);
    assert_eq!(outcome.extracted[0].source, source.path().join("a-copy.msix"));
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, source.path().join("b-copy.msix"));
    assert!(matches!(
        outcome.failed[0].1,
        UnpackError::IdentityCollision { .. }
    ));
    // the second item never reached extraction
    assert_eq!(reader.log.lock().unwrap().written.len(), 1);
}

#[tokio::test]
async fn test_directory_mixes_skipped_and_extracted() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    touch(source.path(), &["App.appx", "license.rtf"]);
    std::fs::create_dir(source.path().join("Folder.msix")).unwrap();
    let reader = FakeReader::new().with("App.appx", FakeContainer::package("App"));

    let outcome = batch(&reader)
        .run(source.path(), dest.path(), &ExtractOptions::new())
        .await
        .unwrap();

    assert_eq!(outcome.extracted.len(), 1);
    assert_eq!(
        outcome.skipped,
        vec![
            source.path().join("Folder.msix"),
            source.path().join("license.rtf")
        ]
    );
    assert!(outcome.is_clean());
}
