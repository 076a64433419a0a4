use assert_fs::TempDir;
use common::command::{init_repository_dir, nogit_commit, run_nogit_command, stdout_of};
use common::file::{FileSpec, delete_path, make_executable, touch, write_file};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::Path;

mod common;

fn status(dir: &Path) -> String {
    stdout_of(&mut run_nogit_command(dir, &["status"]))
}

#[rstest]
fn print_nothing_when_no_files_are_changed(init_repository_dir: TempDir) {
    assert_eq!(status(init_repository_dir.path()), "");
}

#[rstest]
fn list_files_as_new_if_they_are_not_tracked(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("b.txt"), "b".to_string()));
    write_file(FileSpec::new(
        dir.join("new_dir").join("inner").join("c.txt"),
        "c".to_string(),
    ));

    assert_eq!(status(dir), "NEW b.txt\nNEW new_dir/inner/c.txt\n");
}

#[rstest]
fn do_not_list_empty_untracked_directories(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    std::fs::create_dir_all(dir.join("empty").join("nested")).unwrap();

    assert_eq!(status(dir), "");
}

#[rstest]
fn staged_but_uncommitted_files_are_new(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("staged.txt"), "staged".to_string()));
    run_nogit_command(dir, &["add", "staged.txt"])
        .assert()
        .success();

    assert_eq!(status(dir), "NEW staged.txt\n");
}

#[rstest]
fn report_files_with_modified_contents(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "changed".to_string()));
    write_file(FileSpec::new(
        dir.join("a").join("2.txt"),
        "modified".to_string(),
    ));

    assert_eq!(status(dir), "MODIFIED 1.txt\nMODIFIED a/2.txt\n");
}

#[rstest]
fn report_modified_files_with_unchanged_size(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let file = dir.join("a").join("b").join("3.txt");
    write_file(FileSpec::new(file.clone(), "hello".to_string()));
    touch(&file);

    assert_eq!(status(dir), "MODIFIED a/b/3.txt\n");
}

#[rstest]
fn report_modified_modes(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    make_executable(&dir.join("a").join("2.txt"));

    assert_eq!(status(dir), "MODIFIED a/2.txt\n");
}

#[rstest]
fn print_nothing_if_a_file_is_touched(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    touch(&dir.join("1.txt"));

    assert_eq!(status(dir), "");
    // the refreshed stat data is written back, so a second run agrees
    assert_eq!(status(dir), "");
}

#[rstest]
fn report_deleted_files(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    delete_path(&dir.join("a").join("2.txt"));

    assert_eq!(status(dir), "DELETED a/2.txt\n");
}

#[rstest]
fn report_files_in_deleted_directories(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    delete_path(&dir.join("a"));

    assert_eq!(status(dir), "DELETED a/2.txt\nDELETED a/b/3.txt\n");
}

#[rstest]
fn report_renamed_files(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    std::fs::rename(dir.join("1.txt"), dir.join("one.txt")).unwrap();

    assert_eq!(status(dir), "RENAMED 1.txt -> one.txt\n");
}

#[rstest]
fn report_a_file_replaced_by_a_directory_as_typechange(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    delete_path(&dir.join("1.txt"));
    write_file(FileSpec::new(
        dir.join("1.txt").join("inner.txt"),
        "inner".to_string(),
    ));

    assert_eq!(status(dir), "NEW 1.txt/inner.txt\nTYPECHANGE 1.txt\n");
}

#[rstest]
fn report_a_file_replaced_by_a_symlink_as_typechange(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    delete_path(&dir.join("1.txt"));
    std::os::unix::fs::symlink("a/2.txt", dir.join("1.txt")).unwrap();

    assert_eq!(status(dir), "TYPECHANGE 1.txt\n");
}

#[rstest]
fn report_ignored_files_and_directories(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(
        dir.join(".gitignore"),
        "*.log\ntarget/\n".to_string(),
    ));
    run_nogit_command(dir, &["add", ".gitignore"])
        .assert()
        .success();
    nogit_commit(dir, "Ignore build output").assert().success();

    write_file(FileSpec::new(dir.join("debug.log"), "noise".to_string()));
    write_file(FileSpec::new(
        dir.join("target").join("out.bin"),
        "binary".to_string(),
    ));

    assert_eq!(status(dir), "IGNORED debug.log\nIGNORED target/\n");
}

#[rstest]
fn changes_are_listed_by_category(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("z_new.txt"), "new".to_string()));
    write_file(FileSpec::new(dir.join("1.txt"), "changed".to_string()));
    delete_path(&dir.join("a").join("b").join("3.txt"));

    assert_eq!(
        status(dir),
        "NEW z_new.txt\nMODIFIED 1.txt\nDELETED a/b/3.txt\n"
    );
}
