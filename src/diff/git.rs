//! `git diff --no-index` wrapper for comparing two in-memory file versions.
//!
//! Each call writes both versions to uniquely named scratch files in the OS
//! temp directory and shells out to `git` via `tokio::process::Command`.
//! The scratch files are owned by [`ScratchPair`] and removed when it drops,
//! on every exit path.

use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use super::render::reduce_diff_output;
use super::DiffError;

/// Default upper bound for a single diff tool invocation.
pub const DEFAULT_DIFF_TIMEOUT: Duration = Duration::from_secs(30);

/// Computes reduced diffs between two versions of a file.
#[derive(Debug, Clone)]
pub struct DiffRenderer {
    program: PathBuf,
    timeout: Duration,
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout: DEFAULT_DIFF_TIMEOUT,
        }
    }
}

impl DiffRenderer {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Diff `old_content` → `new_content` and reduce the output to hunks.
    ///
    /// Identical inputs yield an empty string. Either side may be empty.
    pub async fn render_diff(
        &self,
        new_content: &str,
        old_content: &str,
    ) -> Result<String, DiffError> {
        let pair = ScratchPair::write(old_content, new_content)?;
        let raw = self.run(&pair).await?;
        Ok(reduce_diff_output(&raw))
    }

    /// Run the diff tool and return its stdout.
    ///
    /// `git diff --no-index` exits 1 when the files differ; only a spawn
    /// failure or any other exit status is an error.
    async fn run(&self, pair: &ScratchPair) -> Result<String, DiffError> {
        let child = tokio::process::Command::new(&self.program)
            .args(["diff", "--no-index", "--no-color", "--no-ext-diff", "--"])
            .arg(pair.old.path())
            .arg(pair.new.path())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| DiffError::TimedOut(self.timeout))?
            .map_err(|e| DiffError::Spawn {
                program: self.program.display().to_string(),
                source: e,
            })?;

        match output.status.code() {
            Some(0) | Some(1) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            _ => Err(DiffError::ToolFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}

/// Old/new scratch files for one diff. Deleted on drop; deletion errors are ignored.
struct ScratchPair {
    old: NamedTempFile,
    new: NamedTempFile,
}

impl ScratchPair {
    fn write(old_content: &str, new_content: &str) -> Result<Self, DiffError> {
        Ok(Self {
            old: scratch_file("old-", old_content)?,
            new: scratch_file("new-", new_content)?,
        })
    }
}

fn scratch_file(prefix: &str, content: &str) -> Result<NamedTempFile, DiffError> {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".tmp")
        .tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}
