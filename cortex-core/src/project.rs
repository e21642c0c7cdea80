//! Project identity
//!
//! Events and resume state are keyed by a short, stable hash of the project
//! root. The root is the nearest ancestor of the working directory that
//! contains `.git`; outside a repository the working directory itself is
//! used.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Length of the hex project hash.
const PROJECT_HASH_LEN: usize = 16;

/// A resolved project root and its storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
    pub path: PathBuf,
    pub hash: String,
}

/// Resolve the project that `cwd` belongs to.
pub fn identify_project(cwd: impl AsRef<Path>) -> ProjectIdentity {
    let cwd = cwd.as_ref();
    let root = find_git_root(cwd).unwrap_or_else(|| cwd.to_path_buf());
    let hash = project_hash(&root);
    ProjectIdentity { path: root, hash }
}

/// First 16 hex chars of the SHA-256 of the path string.
pub fn project_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    let mut hash = hex::encode(digest);
    hash.truncate(PROJECT_HASH_LEN);
    hash
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Branch checked out in the repository at `root`.
///
/// Reads `.git/HEAD` directly. Returns an empty string for a detached HEAD,
/// a missing repository, or a worktree whose `.git` is a file.
pub fn current_branch(root: &Path) -> String {
    let head = match std::fs::read_to_string(root.join(".git").join("HEAD")) {
        Ok(head) => head,
        Err(_) => return String::new(),
    };
    head.trim()
        .strip_prefix("ref: refs/heads/")
        .unwrap_or_default()
        .to_string()
}
