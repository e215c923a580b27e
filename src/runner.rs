// src/runner.rs

//! Execution engine seam.
//!
//! The agent never runs test cases itself; it hands a [`TestPackage`] to a
//! [`TestEngine`] and gets a result tree back. [`CommandTestEngine`] is the
//! production engine: the package file is an executable test runner that
//! prints an XML result document on stdout.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info};

use crate::agent::BoxFuture;
use crate::errors::{AgentError, Result};
use crate::package::TestPackage;
use crate::results::{ResultNode, parse_result_xml};

/// Which tests to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TestFilter {
    /// Run everything.
    #[default]
    Empty,
    /// Run only tests with these full names.
    Names(Vec<String>),
}

impl TestFilter {
    pub fn is_empty(&self) -> bool {
        match self {
            TestFilter::Empty => true,
            TestFilter::Names(names) => names.is_empty(),
        }
    }
}

/// Something that can run a test package and produce a result tree.
pub trait TestEngine: Send {
    fn run<'a>(
        &'a mut self,
        package: &'a TestPackage,
        filter: &'a TestFilter,
    ) -> BoxFuture<'a, Result<ResultNode>>;
}

/// Runs the package file as an executable test runner.
///
/// The runner is started in the package's directory with
/// `--result-format=xml` (and one `--where=<name>` per filtered test), and
/// must print the result document on stdout. A relative package path is
/// resolved against the base directory (default: the current directory)
/// before anything else.
#[derive(Debug, Clone, Default)]
pub struct CommandTestEngine {
    base_dir: Option<PathBuf>,
}

impl CommandTestEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Absolute location of the package executable.
    pub fn resolve(&self, package: &Path) -> Result<PathBuf> {
        if package.is_absolute() {
            return Ok(package.to_path_buf());
        }
        let base = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        Ok(base.join(package))
    }

    fn command(program: &Path, filter: &TestFilter) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("--result-format=xml");
        if let TestFilter::Names(names) = filter {
            for name in names {
                cmd.arg(format!("--where={name}"));
            }
        }
        if let Some(dir) = program.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl TestEngine for CommandTestEngine {
    fn run<'a>(
        &'a mut self,
        package: &'a TestPackage,
        filter: &'a TestFilter,
    ) -> BoxFuture<'a, Result<ResultNode>> {
        Box::pin(async move {
            let program = self.resolve(package.full_name())?;
            info!(package = %program.display(), "running test package");

            let output = Self::command(&program, filter)
                .output()
                .await
                .with_context(|| format!("running test package {:?}", program))?;

            for line in String::from_utf8_lossy(&output.stderr).lines() {
                debug!(package = %program.display(), "stderr: {}", line);
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            parse_result_xml(&stdout).map_err(|e| {
                AgentError::ResultError(format!(
                    "test package {:?} exited with {} without a usable result document: {e}",
                    program, output.status
                ))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_runs_everything() {
        assert!(TestFilter::default().is_empty());
        assert!(TestFilter::Names(vec![]).is_empty());
        assert!(!TestFilter::Names(vec!["A.b".to_string()]).is_empty());
    }

    #[tokio::test]
    async fn missing_package_is_an_error() {
        let package = TestPackage::new("/definitely/not/here/suite");
        let mut engine = CommandTestEngine::new();
        assert!(engine.run(&package, &TestFilter::Empty).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn parses_result_printed_by_the_package() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("suite.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '<test-run result=\"Passed\" testcasecount=\"1\" passed=\"1\" failed=\"0\" warnings=\"0\" inconclusive=\"0\" skipped=\"0\"/>'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let package = TestPackage::new(&script);
        let mut engine = CommandTestEngine::new();
        let node = engine.run(&package, &TestFilter::Empty).await.unwrap();
        assert_eq!(node.attribute("passed"), Some("1"));
    }

    #[test]
    fn relative_package_resolves_against_base_dir() {
        let engine = CommandTestEngine::with_base_dir("/srv/work");
        assert_eq!(
            engine.resolve(Path::new("bin/suite")).unwrap(),
            PathBuf::from("/srv/work/bin/suite")
        );
        assert_eq!(
            engine.resolve(Path::new("/abs/suite")).unwrap(),
            PathBuf::from("/abs/suite")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_package_given_by_relative_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let script = bin.join("suite.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '<test-run result=\"Passed\" testcasecount=\"0\" passed=\"0\" failed=\"0\" warnings=\"0\" inconclusive=\"0\" skipped=\"0\"/>'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let package = TestPackage::new("bin/suite.sh");
        let mut engine = CommandTestEngine::with_base_dir(dir.path());
        let node = engine.run(&package, &TestFilter::Empty).await.unwrap();
        assert_eq!(node.attribute("result"), Some("Passed"));
    }
}
