//! Locating Claude Code transcripts on disk
//!
//! Transcripts live in `~/.claude/projects/<encoded-path>/<session>.jsonl`,
//! where the encoded path is the project's absolute path with `/` replaced by
//! `-`. `agent-*.jsonl` files are sub-agent conversations and already appear
//! in the main session through tool results.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Encode a project path the way Claude Code names its project folders.
pub fn encode_project_path(project_cwd: &str) -> String {
    project_cwd.replace('/', "-")
}

/// Transcript directory for `project_cwd` under `home`, if it exists.
pub fn find_transcript_dir(home: &Path, project_cwd: &str) -> Option<PathBuf> {
    let dir = home
        .join(".claude")
        .join("projects")
        .join(encode_project_path(project_cwd));
    dir.is_dir().then_some(dir)
}

/// Most recently modified main-session transcript in `transcript_dir`.
pub fn find_latest_transcript(transcript_dir: &Path) -> Option<PathBuf> {
    if !transcript_dir.is_dir() {
        return None;
    }

    let pattern = transcript_dir.join("*.jsonl");
    let entries = match glob::glob(&pattern.to_string_lossy()) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %transcript_dir.display(), error = %e, "Invalid transcript glob");
            return None;
        }
    };

    entries
        .flatten()
        .filter(|path| !is_agent_file(path))
        .map(|path| {
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

/// Latest transcript Claude Code wrote for `project_cwd`.
pub fn discover_transcript(home: &Path, project_cwd: &str) -> Option<PathBuf> {
    let found = find_transcript_dir(home, project_cwd).and_then(|dir| find_latest_transcript(&dir));
    if let Some(path) = &found {
        tracing::debug!(path = %path.display(), "Discovered transcript");
    }
    found
}

fn is_agent_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.starts_with("agent-"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, modified: SystemTime) {
        std::fs::write(path, "{}\n").unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(modified).unwrap();
    }

    #[test]
    fn test_encode_project_path() {
        assert_eq!(
            encode_project_path("/Users/james/Projects/myapp"),
            "-Users-james-Projects-myapp"
        );
    }

    #[test]
    fn test_find_transcript_dir() {
        let home = TempDir::new().unwrap();
        let dir = home.path().join(".claude/projects/-Users-test-project");
        std::fs::create_dir_all(&dir).unwrap();

        assert_eq!(
            find_transcript_dir(home.path(), "/Users/test/project"),
            Some(dir)
        );
        assert_eq!(find_transcript_dir(home.path(), "/nonexistent/path"), None);
    }

    #[test]
    fn test_find_latest_by_mtime_excluding_agents() {
        let dir = TempDir::new().unwrap();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        let old = dir.path().join("aaaa-bbbb-cccc.jsonl");
        let new = dir.path().join("dddd-eeee-ffff.jsonl");
        let agent = dir.path().join("agent-task-001.jsonl");
        touch(&old, base);
        touch(&new, base + Duration::from_secs(10));
        touch(&agent, base + Duration::from_secs(20));

        assert_eq!(find_latest_transcript(dir.path()), Some(new));
    }

    #[test]
    fn test_find_latest_none_cases() {
        let dir = TempDir::new().unwrap();
        assert_eq!(find_latest_transcript(dir.path()), None);
        assert_eq!(find_latest_transcript(&dir.path().join("missing")), None);

        touch(&dir.path().join("agent-only.jsonl"), SystemTime::now());
        assert_eq!(find_latest_transcript(dir.path()), None);
    }

    #[test]
    fn test_discover_transcript() {
        let home = TempDir::new().unwrap();
        assert_eq!(discover_transcript(home.path(), "/work/app"), None);

        let dir = home.path().join(".claude/projects/-work-app");
        std::fs::create_dir_all(&dir).unwrap();
        let session = dir.join("session-001.jsonl");
        touch(&session, SystemTime::now());

        assert_eq!(discover_transcript(home.path(), "/work/app"), Some(session));
    }
}
