use derive_new::new;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Descriptor {
    File(FileSpec),
    Directory(DirectorySpec),
}

#[derive(Debug, Clone, Eq, PartialEq, new)]
pub struct FileSpec {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Clone, Eq, PartialEq, new)]
pub struct DirectorySpec {
    pub path: PathBuf,
    pub files: Vec<Descriptor>,
}

pub fn write_file(file_spec: FileSpec) {
    // make sure the parent directory exists
    if let Some(parent) = file_spec.path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("Failed to create directory {:?}: {}", parent, e));
    }

    std::fs::write(&file_spec.path, &file_spec.content)
        .unwrap_or_else(|e| panic!("Failed to write file {:?}: {}", file_spec.path, e));
}

pub fn write_generated_files(dir: &Path, files_count: usize) -> Vec<FileSpec> {
    use fake::{
        Fake,
        faker::lorem::en::{Word, Words},
    };

    (0..files_count)
        .map(|index| {
            // the index keeps names unique when the faker repeats a word
            let file_name = format!("{}_{index}.txt", Word().fake::<String>());
            let file_path = dir.join(&file_name);
            let file_content = Words(5..10).fake::<Vec<String>>().join(" ");

            let file_spec = FileSpec::new(file_path, file_content);
            write_file(file_spec.clone());

            file_spec
        })
        .collect::<Vec<_>>()
}

pub fn write_generated_directory(
    dir: &Path,
    files_count: usize,
    subdirs_count: usize,
    depth: usize,
) -> DirectorySpec {
    use fake::{Fake, faker::lorem::en::Word};

    let dir_name = format!("dir_{}_{depth}", Word().fake::<String>());
    let dir_path = dir.join(&dir_name);
    create_directory(&dir_path);

    let mut descriptors = write_generated_files(&dir_path, files_count)
        .into_iter()
        .map(Descriptor::File)
        .collect::<Vec<_>>();

    if depth > 0 {
        for _ in 0..subdirs_count {
            let subdir_spec =
                write_generated_directory(&dir_path, files_count, subdirs_count, depth - 1);
            descriptors.push(Descriptor::Directory(subdir_spec));
        }
    }

    DirectorySpec::new(dir_path, descriptors)
}

/// Every file below `descriptor`, as `/`-separated paths relative to `root`.
pub fn list_all_files(root: &Path, descriptor: &Descriptor) -> Vec<String> {
    let mut files = Vec::new();

    match descriptor {
        Descriptor::File(file_spec) => {
            let relative = file_spec
                .path
                .strip_prefix(root)
                .unwrap_or_else(|_| panic!("{:?} is outside {:?}", file_spec.path, root));
            files.push(relative.to_string_lossy().into_owned());
        }
        Descriptor::Directory(dir_spec) => {
            for desc in &dir_spec.files {
                files.extend(list_all_files(root, desc));
            }
        }
    }

    files.sort();
    files
}

pub fn create_directory(path: &Path) {
    std::fs::create_dir_all(path)
        .unwrap_or_else(|e| panic!("Failed to create directory {:?}: {}", path, e));
}

pub fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {:?}: {}", path, e))
}

pub fn delete_path(path: &Path) {
    if path.is_dir() {
        std::fs::remove_dir_all(path)
            .unwrap_or_else(|e| panic!("Failed to delete directory {:?}: {}", path, e));
    } else {
        std::fs::remove_file(path)
            .unwrap_or_else(|e| panic!("Failed to delete file {:?}: {}", path, e));
    }
}

pub fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)
        .unwrap_or_else(|e| panic!("Failed to stat {:?}: {}", path, e))
        .permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions)
        .unwrap_or_else(|e| panic!("Failed to chmod {:?}: {}", path, e));
}

/// Push the file's mtime forward without changing its content.
pub fn touch(path: &Path) {
    let later = filetime::FileTime::from_unix_time(
        filetime::FileTime::now().unix_seconds() + 60,
        0,
    );
    filetime::set_file_mtime(path, later)
        .unwrap_or_else(|e| panic!("Failed to touch {:?}: {}", path, e));
}
