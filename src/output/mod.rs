/// Scratch directory for generated scores and audio
///
/// Every file the tools produce is allocated here. The directory owns the
/// lifecycle of those files according to its cleanup policy, so nothing is
/// left behind in an unguarded shared location.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix shared by every generated file name
pub const GENERATED_PREFIX: &str = "generated_";

/// Errors that can occur while managing the output directory
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read output directory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cleanup policy '{0}'. Valid options: keep, remove-on-exit, expire:<seconds>")]
    InvalidPolicy(String),
}

/// What happens to generated files over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Generated files are never deleted
    #[default]
    Keep,
    /// The whole directory is removed when the server shuts down
    RemoveOnExit,
    /// Generated files older than the given age are pruned before each allocation
    ExpireAfter(Duration),
}

impl FromStr for CleanupPolicy {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(CleanupPolicy::Keep),
            "remove-on-exit" => Ok(CleanupPolicy::RemoveOnExit),
            other => {
                let secs = other
                    .strip_prefix("expire:")
                    .and_then(|n| n.trim().parse::<u64>().ok())
                    .ok_or_else(|| OutputError::InvalidPolicy(s.to_string()))?;
                Ok(CleanupPolicy::ExpireAfter(Duration::from_secs(secs)))
            }
        }
    }
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupPolicy::Keep => write!(f, "keep"),
            CleanupPolicy::RemoveOnExit => write!(f, "remove-on-exit"),
            CleanupPolicy::ExpireAfter(age) => write!(f, "expire:{}", age.as_secs()),
        }
    }
}

/// A file previously produced in the output directory
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Local>,
}

/// Owned scratch directory for generated files
#[derive(Debug)]
pub struct OutputDir {
    root: PathBuf,
    policy: CleanupPolicy,
}

impl OutputDir {
    /// Create (if needed) and take ownership of the directory at `root`
    pub fn create(root: impl Into<PathBuf>, policy: CleanupPolicy) -> Result<Self, OutputError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| OutputError::Create {
            path: root.clone(),
            source,
        })?;

        info!("Output directory ready at {} (cleanup: {})", root.display(), policy);
        Ok(Self { root, policy })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    /// Reserve a fresh path for a generated file with the given extension
    ///
    /// Names look like `generated_20240101_120000_1a2b3c4d.wav`. The random
    /// suffix keeps two allocations in the same second apart.
    pub async fn allocate(&self, extension: &str) -> Result<PathBuf, OutputError> {
        if let CleanupPolicy::ExpireAfter(age) = self.policy {
            let pruned = self.prune_older_than(age).await?;
            if pruned > 0 {
                debug!("Pruned {} expired files from {}", pruned, self.root.display());
            }
        }

        // The directory may have been removed from under us
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| OutputError::Create {
                path: self.root.clone(),
                source,
            })?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        let name = format!(
            "{}{}_{}.{}",
            GENERATED_PREFIX,
            timestamp,
            &suffix[..8],
            extension.trim_start_matches('.')
        );

        Ok(self.root.join(name))
    }

    /// List the files in the directory, sorted by name
    pub async fn list(&self) -> Result<Vec<GeneratedFile>, OutputError> {
        let root = self.root.clone();
        run_blocking(&self.root, move || list_dir(&root)).await
    }

    /// Delete generated files whose modification time is older than `age`
    ///
    /// Returns the number of files removed. Files not created by this
    /// directory (without the generated prefix) are left alone.
    pub async fn prune_older_than(&self, age: Duration) -> Result<usize, OutputError> {
        let root = self.root.clone();
        run_blocking(&self.root, move || prune_dir(&root, age)).await
    }
}

/// Run directory work on the blocking pool
async fn run_blocking<T, F>(root: &Path, task: F) -> Result<T, OutputError>
where
    F: FnOnce() -> Result<T, OutputError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| OutputError::Read {
            path: root.to_path_buf(),
            source: std::io::Error::other(e),
        })?
}

fn list_dir(root: &Path) -> Result<Vec<GeneratedFile>, OutputError> {
    let read_err = |source| OutputError::Read {
        path: root.to_path_buf(),
        source,
    };

    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(root).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let metadata = entry.metadata().map_err(read_err)?;
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push(GeneratedFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
            size: metadata.len(),
            modified: DateTime::<Local>::from(modified),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn prune_dir(root: &Path, age: Duration) -> Result<usize, OutputError> {
    let now = SystemTime::now();
    let mut removed = 0;

    for file in list_dir(root)? {
        if !file.name.starts_with(GENERATED_PREFIX) {
            continue;
        }

        let modified = SystemTime::from(file.modified);
        let expired = now
            .duration_since(modified)
            .map(|elapsed| elapsed >= age)
            .unwrap_or(false);

        if expired {
            match fs::remove_file(&file.path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to prune {}: {}", file.path.display(), e),
            }
        }
    }

    Ok(removed)
}

impl Drop for OutputDir {
    /// Remove what this server generated; anything else in the directory stays
    fn drop(&mut self) {
        if self.policy != CleanupPolicy::RemoveOnExit {
            return;
        }

        let files = match list_dir(&self.root) {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to clean up {}: {}", self.root.display(), e);
                return;
            }
        };

        for file in files.iter().filter(|f| f.name.starts_with(GENERATED_PREFIX)) {
            if let Err(e) = fs::remove_file(&file.path) {
                warn!("Failed to remove {}: {}", file.path.display(), e);
            }
        }

        // Only succeeds when nothing else lives in the directory
        match fs::remove_dir(&self.root) {
            Ok(()) => info!("Removed output directory {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Keeping output directory {}: {}", self.root.display(), e),
        }
    }
}
