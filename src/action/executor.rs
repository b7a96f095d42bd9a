//! Local execution of planned actions.

use super::{Action, CopyAction, ExpandTemplateAction, RunAction, Template, render};
use crate::error::{Context, Error, ErrorExt, Result};
use crate::utils::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Runs actions on the local machine, relative to an execution root.
///
/// Actions run one at a time in the order given. The executor neither caches
/// nor sandboxes, so `no-cache` and `no-sandbox` are always satisfied;
/// `requires-darwin` actions fail on other hosts.
#[derive(Clone, Debug)]
pub struct LocalExecutor {
    exec_root: PathBuf,
}

impl LocalExecutor {
    /// Creates an executor resolving relative paths against `exec_root`.
    ///
    /// A relative root is anchored at the current directory, since child
    /// processes run with the root as their working directory.
    pub fn new(exec_root: impl Into<PathBuf>) -> Self {
        let exec_root = exec_root.into();
        Self {
            exec_root: std::path::absolute(&exec_root).unwrap_or(exec_root),
        }
    }

    /// The execution root.
    pub fn exec_root(&self) -> &Path {
        &self.exec_root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.exec_root.join(path)
    }

    /// Runs every action in order, stopping at the first failure.
    pub async fn execute_all(&self, actions: &[Action]) -> Result<()> {
        for action in actions {
            self.execute(action)
                .await
                .with_context(|| format!("{} action failed", action.mnemonic()))?;
        }
        Ok(())
    }

    /// Runs a single action.
    pub async fn execute(&self, action: &Action) -> Result<()> {
        match action {
            Action::Copy(copy) => self.copy(copy).await,
            Action::ExpandTemplate(expand) => self.expand_template(expand).await,
            Action::Run(run) => self.run(run).await,
        }
    }

    async fn copy(&self, copy: &CopyAction) -> Result<()> {
        log::debug!("{}: {} -> {}", copy.mnemonic, copy.src.display(), copy.dst.display());
        fs::copy_path(&self.resolve(&copy.src), &self.resolve(&copy.dst)).await
    }

    async fn expand_template(&self, expand: &ExpandTemplateAction) -> Result<()> {
        let output = self.resolve(&expand.output);
        let template = match &expand.template {
            Template::File(path) => Template::File(self.resolve(path)),
            embedded => embedded.clone(),
        };
        let rendered = render(&template, &expand.substitutions)?;

        fs::create_parent_dir(&output).await?;
        tokio::fs::write(&output, rendered)
            .await
            .fs_context("writing expanded template", &output)?;

        #[cfg(unix)]
        {
            if expand.is_executable {
                use std::os::unix::fs::PermissionsExt;
                tokio::fs::set_permissions(&output, std::fs::Permissions::from_mode(0o755))
                    .await
                    .fs_context("failed to set executable permissions", &output)?;
            }
        }

        log::debug!("Expanded template into {}", output.display());
        Ok(())
    }

    fn program(&self, executable: &Path) -> PathBuf {
        if executable.components().count() == 1
            && let Ok(found) = which::which(executable)
        {
            return found;
        }
        self.resolve(executable)
    }

    async fn run(&self, run: &RunAction) -> Result<()> {
        let requirements = run.execution_requirements;
        if requirements.requires_darwin && !cfg!(target_os = "macos") {
            return Err(Error::RequiresDarwin {
                mnemonic: run.mnemonic.clone(),
            });
        }
        if requirements.no_cache || requirements.no_sandbox {
            log::debug!(
                "{} runs with {:?}",
                run.mnemonic,
                requirements.to_map().keys().collect::<Vec<_>>()
            );
        }

        for output in &run.outputs {
            fs::create_parent_dir(&self.resolve(output)).await?;
        }

        if !run.progress_message.is_empty() {
            log::info!("{}", run.progress_message);
        }

        let program = self.program(&run.executable);
        let output = Command::new(&program)
            .args(&run.arguments)
            .current_dir(&self.exec_root)
            .output()
            .await
            .map_err(|error| Error::CommandFailed {
                command: program.display().to_string(),
                error,
            })?;

        if !output.status.success() {
            return Err(Error::ActionFailed {
                mnemonic: run.mnemonic.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
