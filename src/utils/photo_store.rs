use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;
use uuid::Uuid;

/// Destination for employee photos.
///
/// `save` returns the relative path that gets recorded on the employee.
pub trait PhotoStore: Send + Sync {
    fn save(&self, original_name: &str, bytes: &[u8]) -> io::Result<String>;

    fn remove(&self, stored_path: &str) -> io::Result<()>;
}

/// Photos on local disk, referenced as `<public_prefix>/<file name>`.
///
/// The prefix is what clients see and is always relative. It does not depend on
/// where `root` lives on disk.
pub struct DiskPhotoStore {
    root: PathBuf,
    public_prefix: String,
}

impl DiskPhotoStore {
    /// Creates the upload directory. Called once at startup.
    pub fn init(root: impl Into<PathBuf>, public_prefix: &str) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let public_prefix = public_prefix
            .replace('\\', "/")
            .trim_start_matches("./")
            .trim_matches('/')
            .to_string();
        if public_prefix.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "photo path prefix cannot be empty",
            ));
        }
        info!(dir = %root.display(), prefix = %public_prefix, "Photo directory ready");

        Ok(Self {
            root,
            public_prefix,
        })
    }

    fn file_name_of<'a>(&self, stored_path: &'a str) -> Option<&'a str> {
        stored_path
            .strip_prefix(&self.public_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains('/'))
    }
}

impl PhotoStore for DiskPhotoStore {
    fn save(&self, original_name: &str, bytes: &[u8]) -> io::Result<String> {
        let file_name = unique_file_name(original_name);
        fs::write(self.root.join(&file_name), bytes)?;
        Ok(format!("{}/{}", self.public_prefix, file_name))
    }

    fn remove(&self, stored_path: &str) -> io::Result<()> {
        let name = self.file_name_of(stored_path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{stored_path} is not inside the photo directory"),
            )
        })?;
        fs::remove_file(self.root.join(name))
    }
}

/// `<timestamp>_<random>_<sanitised name>` so concurrent uploads of the same
/// file never overwrite each other.
pub fn unique_file_name(original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let mut clean: String = base
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    if clean.trim_matches(|c| c == '.' || c == '_').is_empty() {
        clean = "photo".to_string();
    }

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let nonce = Uuid::new_v4().to_simple().to_string();

    format!("{stamp}_{}_{clean}", &nonce[..8])
}
