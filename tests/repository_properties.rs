use assert_fs::TempDir;
use common::file::{FileSpec, read_file, write_file};
use nogit::areas::refs::HeadState;
use nogit::areas::repository::Repository;
use nogit::artifacts::branch::branch_name::BranchName;
use nogit::artifacts::checkout::CheckoutReport;
use nogit::artifacts::log::rev_list::{WalkOptions, WalkOrder};
use nogit::artifacts::objects::blob::Blob;
use nogit::artifacts::objects::commit::{Author, Commit};
use nogit::artifacts::objects::object::Object;
use nogit::artifacts::objects::object_id::ObjectId;
use nogit::artifacts::objects::object_type::ObjectType;
use nogit::artifacts::objects::tree::Tree;
use nogit::artifacts::status::file_change::StatusCategory;
use nogit::commands::porcelain::commit::CommitOptions;
use nogit::commands::porcelain::rev_list::RevListOptions;
use nogit::errors::RepositoryError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

mod common;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A fresh working repository with an identity configured.
fn init_repository() -> (TempDir, Repository) {
    common::redirect_temp_dir();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let repository = Repository::init(dir.path(), false).expect("Failed to init repository");

    let mut config = repository.config().expect("Failed to load config");
    config.set_string("user.name", "Test User").unwrap();
    config.set_string("user.email", "test@example.com").unwrap();
    config.save().unwrap();

    (dir, repository)
}

fn work_path(repository: &Repository, name: &str) -> PathBuf {
    repository
        .work_dir()
        .expect("repository has a working tree")
        .join(name)
}

fn write(repository: &Repository, name: &str, content: &str) -> PathBuf {
    let path = work_path(repository, name);
    write_file(FileSpec::new(path.clone(), content.to_string()));
    path
}

async fn commit_files(
    repository: &Repository,
    files: &[(&str, &str)],
    message: &str,
) -> anyhow::Result<ObjectId> {
    let paths = files
        .iter()
        .map(|(name, content)| write(repository, name, content))
        .collect::<Vec<_>>();
    repository.add(&paths).await?;

    repository.commit(&CommitOptions {
        message: message.to_string(),
        description: None,
    })
}

/// A commit with an empty tree at a fixed time, stored but not referenced.
fn synthetic_commit(
    repository: &Repository,
    parents: Vec<ObjectId>,
    timestamp: i64,
    message: &str,
) -> ObjectId {
    let tree_oid = repository.database().store(&Tree::default()).unwrap();
    let when = chrono::DateTime::from_timestamp(timestamp, 0)
        .unwrap()
        .fixed_offset();
    let author = Author::new_with_timestamp("Test User".into(), "test@example.com".into(), when);
    let commit = Commit::new(parents, tree_oid, author.clone(), author, format!("{message}\n"));

    repository.database().store(&commit).unwrap()
}

/// Linear history of `count` commits, oldest first.
fn synthetic_chain(repository: &Repository, count: usize) -> Vec<ObjectId> {
    let mut chain: Vec<ObjectId> = Vec::new();
    for n in 0..count {
        let parents = chain.last().cloned().into_iter().collect();
        chain.push(synthetic_commit(
            repository,
            parents,
            1_700_000_000 + n as i64 * 60,
            &format!("C{}", n + 1),
        ));
    }
    chain
}

fn master() -> BranchName {
    BranchName::try_parse("master".to_string()).unwrap()
}

fn find_error(error: &anyhow::Error) -> RepositoryError {
    RepositoryError::find(error)
        .cloned()
        .unwrap_or_else(|| panic!("untyped error: {error:#}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn stored_blobs_load_back_unchanged(content in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let (_dir, repository) = init_repository();
        let blob = Blob::new(content.clone());

        let first = repository.database().store(&blob).unwrap();
        let second = repository.database().store(&blob).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &blob.object_id().unwrap());

        let (object_type, payload) = repository.database().load(&first).unwrap();
        prop_assert_eq!(object_type, ObjectType::Blob);
        prop_assert_eq!(payload.to_vec(), content);
    }
}

#[tokio::test]
async fn tree_ids_do_not_depend_on_staging_order() -> TestResult {
    let files = [("b.txt", "b"), ("a/x.txt", "x"), ("a.txt", "a"), ("a-b/y.txt", "y")];

    let (_first_dir, first) = init_repository();
    for (name, content) in files {
        let path = write(&first, name, content);
        first.add(&[path]).await?;
    }

    let (_second_dir, second) = init_repository();
    let paths = files
        .iter()
        .rev()
        .map(|(name, content)| write(&second, name, content))
        .collect::<Vec<_>>();
    second.add(&paths).await?;

    let first_tree = first.write_tree()?;
    assert_eq!(first_tree, first.write_tree()?);
    assert_eq!(first_tree, second.write_tree()?);

    Ok(())
}

#[tokio::test]
async fn failed_add_leaves_the_index_unchanged() -> TestResult {
    let (_dir, repository) = init_repository();
    let kept = write(&repository, "kept.txt", "kept");
    std::fs::create_dir_all(work_path(&repository, "folder"))?;

    let mut index = repository.refresh_index()?;
    repository.add_by_path(&mut index, &kept)?;
    index.write()?;
    let before = std::fs::read(repository.index_path())?;

    let mut index = repository.refresh_index()?;
    let missing = repository
        .add_by_path(&mut index, work_path(&repository, "missing.txt"))
        .unwrap_err();
    assert_eq!(
        find_error(&missing),
        RepositoryError::FileNotFound(PathBuf::from("missing.txt"))
    );

    let directory = repository
        .add_by_path(&mut index, work_path(&repository, "folder"))
        .unwrap_err();
    assert_eq!(
        find_error(&directory),
        RepositoryError::PathIsDirectory(PathBuf::from("folder"))
    );

    assert_eq!(index.len(), 1);
    assert!(!index.is_changed());
    assert_eq!(std::fs::read(repository.index_path())?, before);

    Ok(())
}

#[tokio::test]
async fn adding_outside_paths_leaves_the_repository_committable() -> TestResult {
    let (dir, repository) = init_repository();
    commit_files(&repository, &[("a.txt", "a")], "Initial commit").await?;
    write(&repository, ".gitignore", "*.log\n");
    let before = std::fs::read(repository.index_path())?;

    let outside = TempDir::new()?;
    write_file(FileSpec::new(outside.path().join("secret.txt"), "secret".to_string()));
    write_file(FileSpec::new(outside.path().join("sub").join("b.txt"), "b".to_string()));

    for path in [
        outside.path().join("secret.txt"),
        outside.path().join("sub"),
        dir.path().join("..").join("secret.txt"),
    ] {
        let error = repository.add(&[&path]).await.unwrap_err();
        assert!(
            matches!(find_error(&error), RepositoryError::PathOutsideRepository(_)),
            "{} was accepted",
            path.display()
        );
    }

    assert_eq!(std::fs::read(repository.index_path())?, before);
    let keys = repository
        .refresh_index()?
        .entries()
        .map(|entry| entry.key().map(str::to_string))
        .collect::<anyhow::Result<Vec<_>>>()?;
    assert_eq!(keys, vec!["a.txt".to_string()]);

    write(&repository, "a.txt", "changed");
    repository.add(&[work_path(&repository, "a.txt")]).await?;
    repository.commit(&CommitOptions {
        message: "Still committable".to_string(),
        description: None,
    })?;

    Ok(())
}

#[tokio::test]
async fn checking_out_the_current_commit_writes_nothing() -> TestResult {
    let (_dir, repository) = init_repository();
    commit_files(
        &repository,
        &[("a.txt", "a"), ("dir/b.txt", "b")],
        "Initial commit",
    )
    .await?;

    let report = repository.checkout_branch(&master()).await?;

    assert_eq!(report, CheckoutReport::default());
    let status = repository.status()?;
    assert!(status.is_clean());
    assert!(status.paths(StatusCategory::Modified).is_empty());

    Ok(())
}

#[tokio::test]
async fn detached_checkout_and_back_to_master() -> TestResult {
    let (_dir, repository) = init_repository();
    let first = commit_files(&repository, &[("a.txt", "first")], "First").await?;
    let second = commit_files(
        &repository,
        &[("a.txt", "second"), ("b.txt", "new")],
        "Second",
    )
    .await?;

    let report = repository.checkout_detached(first.as_ref()).await?;
    assert_eq!(report, CheckoutReport { written: 1, removed: 1 });
    assert_eq!(repository.refs().head_state()?, HeadState::Detached(first));
    assert_eq!(repository.get_head_commit()?.short_message(), "First");
    assert_eq!(repository.get_master_commit()?.short_message(), "Second");
    assert_eq!(read_file(&work_path(&repository, "a.txt")), "first");
    assert!(!work_path(&repository, "b.txt").exists());

    repository.checkout_branch(&master()).await?;
    assert_eq!(repository.refs().head_state()?, HeadState::Attached(master()));
    assert_eq!(repository.head_oid()?, Some(second));
    assert_eq!(read_file(&work_path(&repository, "a.txt")), "second");
    assert_eq!(read_file(&work_path(&repository, "b.txt")), "new");

    Ok(())
}

#[tokio::test]
async fn status_lists_an_untracked_file_as_new() -> TestResult {
    let (_dir, repository) = init_repository();
    commit_files(&repository, &[("a.txt", "a")], "Initial commit").await?;
    write(&repository, "b.txt", "b");

    let status = repository.status()?;

    assert_eq!(status.paths(StatusCategory::New), vec!["b.txt"]);
    assert!(status.paths(StatusCategory::Modified).is_empty());
    assert!(!status.is_clean());

    Ok(())
}

#[tokio::test]
async fn status_pairs_a_move_into_a_rename() -> TestResult {
    let (_dir, repository) = init_repository();
    commit_files(&repository, &[("old.txt", "same content")], "Initial commit").await?;
    std::fs::rename(
        work_path(&repository, "old.txt"),
        work_path(&repository, "new.txt"),
    )?;

    let status = repository.status()?;

    assert_eq!(status.paths(StatusCategory::Renamed), vec!["new.txt"]);
    assert_eq!(
        status.renames().collect::<Vec<_>>(),
        vec![("old.txt", "new.txt")]
    );
    assert!(status.paths(StatusCategory::Deleted).is_empty());
    assert!(status.paths(StatusCategory::New).is_empty());

    Ok(())
}

#[test]
fn walk_stops_after_max_count() {
    let (_dir, repository) = init_repository();
    let chain = synthetic_chain(&repository, 10);
    let tip = chain.last().unwrap().clone();

    let options = WalkOptions {
        max_count: Some(3),
        ..Default::default()
    };
    let walked = repository
        .walk(tip, options)
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();

    let expected = chain.iter().rev().take(3).cloned().collect::<Vec<_>>();
    assert_eq!(walked, expected);
}

#[test]
fn rev_list_from_a_branch_with_a_limit() -> TestResult {
    let (_dir, repository) = init_repository();
    let chain = synthetic_chain(&repository, 3);
    repository.refs().update_head(&chain[2])?;

    let listed = repository.rev_list(
        "master",
        RevListOptions {
            max_count: Some(2),
            ..Default::default()
        },
    )?;

    assert_eq!(listed, vec![chain[2].to_string(), chain[1].to_string()]);

    Ok(())
}

#[test]
fn merges_are_walked_once_with_children_first() -> TestResult {
    let (_dir, repository) = init_repository();
    let root = synthetic_commit(&repository, vec![], 100, "root");
    let base = synthetic_commit(&repository, vec![root.clone()], 200, "base");
    let left = synthetic_commit(&repository, vec![base.clone()], 300, "left");
    // committed with a clock running behind
    let right = synthetic_commit(&repository, vec![base.clone()], 50, "right");
    let merge = synthetic_commit(&repository, vec![left.clone(), right.clone()], 400, "merge");

    let walk = |order| {
        repository
            .walk(
                merge.clone(),
                WalkOptions {
                    order,
                    max_count: None,
                },
            )
            .collect::<anyhow::Result<Vec<_>>>()
    };

    let topological = walk(WalkOrder::Topological)?;
    assert_eq!(topological.len(), 5);
    let position = |oid: &ObjectId| topological.iter().position(|walked| walked == oid).unwrap();
    assert_eq!(position(&merge), 0);
    assert!(position(&left) < position(&base));
    assert!(position(&right) < position(&base));
    assert!(position(&base) < position(&root));

    // date order trusts the timestamps
    let by_date = walk(WalkOrder::Date)?;
    assert_eq!(by_date, vec![merge, left, base, root, right]);

    Ok(())
}

#[tokio::test]
async fn log_is_empty_before_the_first_commit() -> TestResult {
    let (_dir, repository) = init_repository();

    assert!(repository.log(9)?.is_empty());
    assert_eq!(repository.refs().head_state()?, HeadState::Unborn(master()));

    commit_files(&repository, &[("a.txt", "a")], "First").await?;
    let log = repository.log(9)?;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].author, "Test User <test@example.com>");
    assert_eq!(log[0].message, "First\n");

    Ok(())
}

#[test]
fn a_tampered_object_is_reported_as_corrupt() -> TestResult {
    let (_dir, repository) = init_repository();
    let oid = repository.database().store(&Blob::new("original"))?;

    // a valid zlib stream whose content no longer matches the id
    let object_path = repository.database().objects_path().join(oid.to_path());
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"blob 8\0tampered")?;
    std::fs::remove_file(&object_path)?;
    std::fs::write(&object_path, encoder.finish()?)?;

    let error = repository.database().load(&oid).unwrap_err();
    assert!(matches!(
        find_error(&error),
        RepositoryError::ObjectCorrupt { .. }
    ));
    assert_eq!(find_error(&error).exit_code(), 128);

    Ok(())
}

#[tokio::test]
async fn a_damaged_index_is_reported_as_corrupt() -> TestResult {
    let (_dir, repository) = init_repository();
    commit_files(&repository, &[("a.txt", "a")], "First").await?;

    let index_path = repository.index_path();
    let mut bytes = std::fs::read(&index_path)?;
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    std::fs::write(&index_path, bytes)?;

    let error = repository.refresh_index().unwrap_err();
    assert!(matches!(find_error(&error), RepositoryError::IndexCorrupt(_)));

    Ok(())
}

#[test]
fn cyclic_symbolic_refs_are_rejected() {
    let (_dir, repository) = init_repository();
    let heads = repository.git_dir().join("refs").join("heads");
    std::fs::write(heads.join("a"), "ref: refs/heads/b\n").unwrap();
    std::fs::write(heads.join("b"), "ref: refs/heads/a\n").unwrap();
    std::fs::write(
        repository.git_dir().join("HEAD"),
        "ref: refs/heads/a\n",
    )
    .unwrap();

    let error = repository.resolve("HEAD").unwrap_err();

    assert!(matches!(find_error(&error), RepositoryError::RefCycle(_)));
}

#[test]
fn repositories_are_discovered_from_nested_directories() {
    let (_dir, repository) = init_repository();
    let nested = work_path(&repository, "deeply/nested/dir");
    std::fs::create_dir_all(&nested).unwrap();

    let discovered = Repository::discover(&nested).unwrap();

    assert_eq!(discovered.git_dir(), repository.git_dir());
    assert_eq!(discovered.work_dir(), repository.work_dir());
}

#[test]
fn opening_a_plain_directory_fails() {
    common::redirect_temp_dir();
    let dir = TempDir::new().unwrap();

    let error = Repository::open(dir.path()).unwrap_err();

    assert!(matches!(
        find_error(&error),
        RepositoryError::NotARepository(_)
    ));
    assert!(Path::new(dir.path()).is_dir());
}
