//! # Git CLI Versioning
//!
//! Runs the `git` executable in the repository root. Every invocation can be
//! bounded by a timeout; a timed-out child is killed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use super::errors::{VersioningError, VersioningResult};
use super::{Author, Versioning, VersioningFuture};

/// Versioning through the `git` command line
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    /// Use the `git` found on `PATH`
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout: None,
        }
    }

    /// Use a specific git executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Bound every git invocation
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn describe(&self, args: &[OsString]) -> String {
        let mut command = self.program.to_string_lossy().into_owned();
        for arg in args {
            command.push(' ');
            command.push_str(&arg.to_string_lossy());
        }
        command
    }

    /// Run git with `args` in `root` and collect its output, whatever the
    /// exit status
    async fn output(&self, root: &Path, args: &[OsString]) -> VersioningResult<Output> {
        let description = self.describe(args);
        debug!(command = %description, root = %root.display(), "Running git");

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);

        let output: std::io::Result<Output> = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| VersioningError::Timeout {
                    command: description.clone(),
                    after: limit,
                })?,
            None => command.output().await,
        };
        output.map_err(|source| VersioningError::Spawn {
            command: description,
            source,
        })
    }

    /// Run git with `args` in `root`, returning trimmed stdout
    async fn run(&self, root: &Path, args: Vec<OsString>) -> VersioningResult<String> {
        let output = self.output(root, &args).await?;
        if !output.status.success() {
            return Err(self.failure(&args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn failure(&self, args: &[OsString], output: &Output) -> VersioningError {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        // some failures, such as "nothing to commit", are reported on stdout
        let message = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        VersioningError::CommandFailed {
            command: self.describe(args),
            stderr: message,
        }
    }

    /// Whether the index differs from `HEAD`
    async fn has_staged_changes(&self, root: &Path) -> VersioningResult<bool> {
        let args: Vec<OsString> = vec!["diff".into(), "--cached".into(), "--quiet".into()];
        let output = self.output(root, &args).await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(self.failure(&args, &output)),
        }
    }
}

impl Versioning for GitCli {
    fn stage_add<'a>(
        &'a self,
        root: &'a Path,
        relative_path: &'a Path,
    ) -> VersioningFuture<'a, ()> {
        Box::pin(async move {
            self.run(root, vec!["add".into(), "--".into(), relative_path.into()])
                .await?;
            Ok(())
        })
    }

    fn stage_remove<'a>(
        &'a self,
        root: &'a Path,
        relative_path: &'a Path,
    ) -> VersioningFuture<'a, ()> {
        Box::pin(async move {
            // the file is already gone from the working tree; only the index
            // entry has to go
            self.run(
                root,
                vec![
                    "rm".into(),
                    "--cached".into(),
                    "--ignore-unmatch".into(),
                    "--quiet".into(),
                    "--".into(),
                    relative_path.into(),
                ],
            )
            .await?;
            Ok(())
        })
    }

    fn unstage<'a>(
        &'a self,
        root: &'a Path,
        relative_path: &'a Path,
    ) -> VersioningFuture<'a, ()> {
        Box::pin(async move {
            self.run(
                root,
                vec![
                    "reset".into(),
                    "--quiet".into(),
                    "--".into(),
                    relative_path.into(),
                ],
            )
            .await?;
            Ok(())
        })
    }

    fn commit<'a>(
        &'a self,
        root: &'a Path,
        message: &'a str,
        author: &'a Author,
    ) -> VersioningFuture<'a, String> {
        Box::pin(async move {
            if !self.has_staged_changes(root).await? {
                // rewriting identical bytes stages nothing; HEAD already
                // holds this state
                debug!(root = %root.display(), "Nothing staged, keeping HEAD");
                return self.run(root, vec!["rev-parse".into(), "HEAD".into()]).await;
            }
            self.run(
                root,
                vec![
                    "-c".into(),
                    format!("user.name={}", author.name).into(),
                    "-c".into(),
                    format!("user.email={}", author.email).into(),
                    "commit".into(),
                    "--quiet".into(),
                    "--no-verify".into(),
                    "-m".into(),
                    message.into(),
                ],
            )
            .await?;
            self.run(root, vec!["rev-parse".into(), "HEAD".into()]).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_joins_arguments() {
        let git = GitCli::new();
        let args: Vec<OsString> = vec!["add".into(), "--".into(), "users/a.json".into()];
        assert_eq!(git.describe(&args), "git add -- users/a.json");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let git = GitCli::new().with_program("/nonexistent/git-binary");
        let dir = std::env::temp_dir();

        let err = git
            .stage_add(&dir, Path::new("a.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, VersioningError::Spawn { .. }));
        assert_eq!(err.code(), "GITDB_VERSIONING_SPAWN_FAILED");
    }

    #[tokio::test]
    async fn test_failure_message_falls_back_to_stdout() {
        // `sh -c` stands in for git: silent on stderr, talkative on stdout
        let git = GitCli::new().with_program("sh");
        let args: Vec<OsString> = vec!["-c".into(), "echo nothing to commit; exit 1".into()];
        let dir = std::env::temp_dir();

        let err = git.run(&dir, args).await.unwrap_err();

        match err {
            VersioningError::CommandFailed { stderr, .. } => {
                assert_eq!(stderr, "nothing to commit")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_with_timeout() {
        let git = GitCli::new().with_timeout(Duration::from_secs(5));
        assert_eq!(git.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(GitCli::default().timeout(), None);
    }
}
