//! Writes generated files into the site repository and pushes them.

use std::path::{Path, PathBuf};
use std::process::Command;

use coalwire_shared::{CoalwireError, Result};
use tracing::{info, instrument};

use crate::GeneratedFile;

/// Git-backed static site target.
pub struct SitePublisher {
    repo_path: PathBuf,
}

impl SitePublisher {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Write every generated file under the repo, creating directories as
    /// needed. Paths are repo-relative.
    pub fn write_files(&self, files: &[GeneratedFile]) -> Result<usize> {
        for file in files {
            let target = self.repo_path.join(&file.path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CoalwireError::io(parent.to_path_buf(), e))?;
            }
            std::fs::write(&target, &file.content)
                .map_err(|e| CoalwireError::io(target.clone(), e))?;
        }
        info!(count = files.len(), repo = %self.repo_path.display(), "site files written");
        Ok(files.len())
    }

    /// Stage, commit, and push. A clean tree ("nothing to commit") is
    /// success. Commit messages carry `[ci skip]` so the pages pipeline does
    /// not re-trigger itself.
    #[instrument(skip_all)]
    pub fn commit_and_push(&self, message: &str) -> Result<()> {
        self.git(&["add", "-A"])?;

        let message = if message.contains("[ci skip]") || message.contains("[skip ci]") {
            message.to_string()
        } else {
            format!("{message} [ci skip]")
        };
        let commit = self.run_git(&["commit", "-m", &message])?;
        if !commit.status.success() {
            let stdout = String::from_utf8_lossy(&commit.stdout);
            let stderr = String::from_utf8_lossy(&commit.stderr);
            if stdout.contains("nothing to commit") || stderr.contains("nothing to commit") {
                info!("site already up to date");
                return Ok(());
            }
            return Err(CoalwireError::Publish(format!("git commit: {stderr}")));
        }

        self.git(&["push"])?;
        info!("site pushed");
        Ok(())
    }

    fn run_git(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| CoalwireError::io(self.repo_path.join(".git"), e))
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let output = self.run_git(args)?;
        if !output.status.success() {
            return Err(CoalwireError::Publish(format!(
                "git {}: {}",
                args.first().unwrap_or(&""),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

/// True when `path` is inside a git work tree.
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}
