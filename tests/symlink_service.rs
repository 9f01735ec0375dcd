#![cfg(unix)]

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use lnkview::{
    Availability, Config, OperationError, RepositoryEvent, ShortcutRepository, ShortcutService,
    ValidationError,
};

struct Library {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Library {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().canonicalize()?;

        Ok(Self { _dir: dir, root })
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    fn file(&self, relative: &str, content: &[u8]) -> Result<PathBuf, std::io::Error> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    fn link(&self, relative: &str, target: &Path) -> Result<PathBuf, std::io::Error> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        symlink(target, &path)?;
        Ok(path)
    }
}

fn drain(events: &mut tokio::sync::broadcast::Receiver<RepositoryEvent>) -> Vec<RepositoryEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test]
async fn shortcut_library_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let library = Library::new()?;
    let rock = library.file("music/rock/a.mp3", b"alpha")?;
    let jazz = library.file("music/jazz/b.mp3", b"beta")?;
    library.file("moved/rock/a.mp3", b"alpha")?;
    library.file("moved/jazz/b.mp3", b"beta")?;
    fs::create_dir_all(library.path("dest"))?;

    let first = library.link("links/X/a.mp3.lnk", &rock)?;
    let second = library.link("links/Y/b.mp3.lnk", &jazz)?;
    let again = library.link("links/Y/a again.mp3.lnk", &rock)?;
    let plain = library.file("links/readme.txt", b"not a shortcut")?;

    let config = Config::default();
    let service = ShortcutService::start(ShortcutRepository::with_symlinks(&config))?;
    let mut events = service.subscribe();

    let summary = service.import(vec![library.path("links")])?.join().await?;
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].path, plain);

    assert_eq!(service.check_availability()?.join().await?, 3);
    let snapshot = service.snapshot().await?;
    assert_eq!(snapshot.available_count, 3);
    assert_eq!(snapshot.total_target_bytes, 14);
    assert!(snapshot
        .records
        .iter()
        .all(|record| record.availability == Availability::Available));
    assert_eq!(snapshot.common_target_parent, library.path("music"));

    assert_eq!(service.check_duplicates()?.join().await?, 2);
    let duplicates: Vec<PathBuf> = service
        .snapshot()
        .await?
        .duplicates
        .into_iter()
        .map(|entry| entry.shortcut_path)
        .collect();
    assert_eq!(duplicates, vec![first.clone(), again.clone()]);

    let failures = service.remove_duplicates(vec![again.clone()])?.join().await?;
    assert!(failures.is_empty());
    assert!(fs::symlink_metadata(&again).is_err());

    let copies = service
        .copy_targets(library.path("dest"), config.copy.preserve_hierarchy)
        .await?
        .join()
        .await?;
    assert!(copies.is_empty());
    assert_eq!(fs::read(library.path("dest/X/a.mp3"))?, b"alpha");
    assert_eq!(fs::read(library.path("dest/Y/b.mp3"))?, b"beta");

    let rewrites = service
        .change_parents(library.path("music"), library.path("moved"))
        .await?
        .join()
        .await?;
    assert!(rewrites.is_empty());
    assert_eq!(fs::read_link(&first)?, library.path("moved/rock/a.mp3"));
    assert_eq!(fs::read_link(&second)?, library.path("moved/jazz/b.mp3"));

    assert_eq!(
        drain(&mut events),
        vec![
            RepositoryEvent::ImportedFilesChanged,
            RepositoryEvent::CheckedAvailability,
            RepositoryEvent::CheckedDuplicates,
            RepositoryEvent::RemovedDuplicates,
            RepositoryEvent::CreatedCopies,
            RepositoryEvent::ChangedParents,
        ]
    );

    service.shutdown();
    Ok(())
}

#[tokio::test]
async fn stale_prefix_is_rejected_after_rewrite() -> Result<(), Box<dyn std::error::Error>> {
    let library = Library::new()?;
    let target = library.file("music/a.mp3", b"alpha")?;
    fs::create_dir_all(library.path("moved"))?;
    library.link("links/a.mp3.lnk", &target)?;

    let service = ShortcutService::start(ShortcutRepository::with_symlinks(&Config::default()))?;
    service.import(vec![library.path("links")])?.join().await?;

    service
        .change_parents(library.path("music"), library.path("moved"))
        .await?
        .join()
        .await?;

    let again = service
        .change_parents(library.path("music"), library.path("moved"))
        .await;
    assert!(matches!(
        again,
        Err(OperationError::Validation(ValidationError::OldPrefixNotCommon { .. }))
    ));

    service.check_availability()?.join().await?;
    let snapshot = service.snapshot().await?;
    assert_eq!(snapshot.records[0].availability, Availability::Unavailable);

    service.shutdown();
    Ok(())
}

#[tokio::test]
async fn relative_and_absolute_links_to_one_file_are_duplicates(
) -> Result<(), Box<dyn std::error::Error>> {
    let library = Library::new()?;
    let target = library.file("t/a.mp3", b"alpha")?;
    let absolute = library.link("links/abs.lnk", &target)?;
    let relative = library.link("links/rel.lnk", Path::new("../t/a.mp3"))?;

    let service = ShortcutService::start(ShortcutRepository::with_symlinks(&Config::default()))?;
    service.import(vec![library.path("links")])?.join().await?;
    service.check_availability()?.join().await?;

    let snapshot = service.snapshot().await?;
    for record in &snapshot.records {
        assert_eq!(record.target_path, target);
        assert_eq!(record.availability, Availability::Available);
    }

    assert_eq!(service.check_duplicates()?.join().await?, 2);
    let flagged: Vec<PathBuf> = service
        .snapshot()
        .await?
        .duplicates
        .into_iter()
        .map(|entry| entry.shortcut_path)
        .collect();
    assert_eq!(flagged, vec![absolute, relative]);

    service.shutdown();
    Ok(())
}
