use crate::common::file::{FileSpec, write_file};
use crate::common::redirect_temp_dir;
use assert_cmd::Command;
use assert_fs::TempDir;
use derive_new::new;
use rstest::fixture;
use std::path::Path;

pub const DEFAULT_AUTHOR_DATE: &str = "2023-01-01 12:00:00 +0000";

#[fixture]
pub fn repository_dir() -> TempDir {
    redirect_temp_dir();
    TempDir::new().expect("Failed to create temp dir")
}

/// A repository with one commit holding `1.txt`, `a/2.txt` and `a/b/3.txt`.
#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    run_nogit_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    let file1 = FileSpec::new(repository_dir.path().join("1.txt"), "one".to_string());
    write_file(file1);

    let file2 = FileSpec::new(
        repository_dir.path().join("a").join("2.txt"),
        "two".to_string(),
    );
    write_file(file2);

    let file3 = FileSpec::new(
        repository_dir.path().join("a").join("b").join("3.txt"),
        "three".to_string(),
    );
    write_file(file3);

    run_nogit_command(repository_dir.path(), &["add", "."])
        .assert()
        .success();

    nogit_commit(repository_dir.path(), "Initial commit")
        .assert()
        .success();

    repository_dir
}

/// Four commits, each adding `file<N>.txt`, one day apart.
#[fixture]
pub fn repository_with_multiple_commits(repository_dir: TempDir) -> TempDir {
    run_nogit_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    for (n, message) in ["First", "Second", "Third", "Fourth"].iter().enumerate() {
        let n = n + 1;
        let file = FileSpec::new(
            repository_dir.path().join(format!("file{n}.txt")),
            format!("content {n}"),
        );
        write_file(file);

        run_nogit_command(repository_dir.path(), &["add", "."])
            .assert()
            .success();
        nogit_commit_at(
            repository_dir.path(),
            &format!("{message} commit"),
            &format!("2023-01-0{n} 12:00:00 +0000"),
        )
        .assert()
        .success();
    }

    repository_dir
}

pub fn run_nogit_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("nogit").expect("Failed to find nogit binary");
    cmd.envs(vec![("NO_PAGER", "1")]);
    cmd.env_remove("GIT_AUTHOR_NAME");
    cmd.env_remove("GIT_AUTHOR_EMAIL");
    cmd.env_remove("GIT_AUTHOR_DATE");
    cmd.env_remove("GIT_COMMITTER_NAME");
    cmd.env_remove("GIT_COMMITTER_EMAIL");
    cmd.env_remove("GIT_COMMITTER_DATE");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn run_git_command(dir: &Path, args: &[&str]) -> std::process::Command {
    let mut cmd = std::process::Command::new("git");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

#[derive(Debug, Clone, new)]
pub struct RandomAuthor {
    pub name: String,
    pub email: String,
}

pub fn generate_random_author() -> RandomAuthor {
    use fake::Fake;
    use fake::faker::internet::en::FreeEmail;
    use fake::faker::name::en::Name;

    let name = Name().fake::<String>().replace(" ", "_");
    let email = FreeEmail().fake::<String>();
    RandomAuthor::new(name, email)
}

pub fn nogit_commit(dir: &Path, message: &str) -> Command {
    nogit_commit_at(dir, message, DEFAULT_AUTHOR_DATE)
}

pub fn nogit_commit_at(dir: &Path, message: &str, date: &str) -> Command {
    let mut cmd = run_nogit_command(dir, &["commit", "-m", message]);
    cmd.envs(vec![
        ("GIT_AUTHOR_NAME", "fake_user"),
        ("GIT_AUTHOR_EMAIL", "fake_email@email.com"),
        ("GIT_AUTHOR_DATE", date), // %Y-%m-%d %H:%M:%S %z
    ]);
    cmd
}

pub fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success();
    String::from_utf8(output.get_output().stdout.clone()).expect("stdout is not UTF-8")
}

/// Get the current HEAD commit SHA
pub fn get_head_commit_sha(dir: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let head_path = dir.join(".git").join("HEAD");
    let head_content = std::fs::read_to_string(head_path)?;

    // HEAD file contains either a commit SHA or a ref like "ref: refs/heads/main"
    if let Some(ref_path) = head_content.strip_prefix("ref: ") {
        let ref_file = dir.join(".git").join(ref_path.trim());
        let commit_sha = std::fs::read_to_string(ref_file)?;
        Ok(commit_sha.trim().to_string())
    } else {
        Ok(head_content.trim().to_string())
    }
}

/// Commit ids from HEAD back to the root, as listed by `rev-list`.
pub fn list_commit_ids(dir: &Path) -> Vec<String> {
    stdout_of(&mut run_nogit_command(dir, &["rev-list", "HEAD"]))
        .lines()
        .map(str::to_string)
        .collect()
}
