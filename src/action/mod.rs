//! Planned build actions.
//!
//! Partials never touch the filesystem. They return [`Action`] values that a
//! host executor runs in declaration order. [`LocalExecutor`] is the executor
//! used by the command line front end.

mod executor;
mod template;

pub use executor::LocalExecutor;
pub use template::{DSYM_INFO_PLIST, PROCESS_AND_SIGN, Template, render};

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Hints the executor must honour when running an action.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ExecutionRequirements {
    /// Never cache the result, locally or remotely
    #[serde(rename = "no-cache")]
    pub no_cache: bool,
    /// Run outside any sandbox
    #[serde(rename = "no-sandbox")]
    pub no_sandbox: bool,
    /// Only a Darwin host can run this action
    #[serde(rename = "requires-darwin")]
    pub requires_darwin: bool,
}

impl ExecutionRequirements {
    /// Requirements for actions that touch signing identities.
    ///
    /// Signing needs keychain access and depends on the developer's identity,
    /// so it can be neither cached nor sandboxed, and only runs on macOS.
    pub fn signing() -> Self {
        Self {
            no_cache: true,
            no_sandbox: true,
            requires_darwin: true,
        }
    }

    /// Requirements in the host's string map form.
    pub fn to_map(&self) -> BTreeMap<&'static str, &'static str> {
        let mut map = BTreeMap::new();
        if self.no_cache {
            map.insert("no-cache", "1");
        }
        if self.no_sandbox {
            map.insert("no-sandbox", "1");
        }
        if self.requires_darwin {
            map.insert("requires-darwin", "");
        }
        map
    }
}

/// Copies one file or directory.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CopyAction {
    /// Source path
    pub src: PathBuf,
    /// Destination path
    pub dst: PathBuf,
    /// Short action category
    pub mnemonic: String,
}

/// Renders a template to a file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExpandTemplateAction {
    /// Template to render
    pub template: Template,
    /// Rendered file
    pub output: PathBuf,
    /// Placeholder values
    pub substitutions: BTreeMap<String, String>,
    /// Mark the output executable
    pub is_executable: bool,
}

impl ExpandTemplateAction {
    /// Renders the template with this action's substitutions.
    pub fn render(&self) -> crate::error::Result<String> {
        render(&self.template, &self.substitutions)
    }
}

/// Runs an executable.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RunAction {
    /// Program to run, a path or a name looked up on `PATH`
    pub executable: PathBuf,
    /// Arguments, passed as-is
    pub arguments: Vec<String>,
    /// Files read by the action
    pub inputs: Vec<PathBuf>,
    /// Files or directories produced by the action
    pub outputs: Vec<PathBuf>,
    /// Short action category
    pub mnemonic: String,
    /// Message shown while the action runs
    pub progress_message: String,
    /// Execution hints
    pub execution_requirements: ExecutionRequirements,
}

impl RunAction {
    /// A `/bin/bash -c` invocation of `command`.
    pub fn shell(command: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            executable: PathBuf::from("/bin/bash"),
            arguments: vec!["-c".to_string(), command.into()],
            inputs: Vec::new(),
            outputs: Vec::new(),
            mnemonic: mnemonic.into(),
            progress_message: String::new(),
            execution_requirements: ExecutionRequirements::default(),
        }
    }
}

/// A unit of work planned by a partial.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Copy a file or directory
    Copy(CopyAction),
    /// Render a template
    ExpandTemplate(ExpandTemplateAction),
    /// Run a process
    Run(RunAction),
}

impl Action {
    /// Short action category, used in logs.
    pub fn mnemonic(&self) -> &str {
        match self {
            Action::Copy(copy) => &copy.mnemonic,
            Action::ExpandTemplate(_) => "ExpandTemplate",
            Action::Run(run) => &run.mnemonic,
        }
    }

    /// Paths this action produces.
    pub fn outputs(&self) -> Vec<&PathBuf> {
        match self {
            Action::Copy(copy) => vec![&copy.dst],
            Action::ExpandTemplate(expand) => vec![&expand.output],
            Action::Run(run) => run.outputs.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_requirements_map() {
        let map = ExecutionRequirements::signing().to_map();
        assert_eq!(map.get("no-cache"), Some(&"1"));
        assert_eq!(map.get("no-sandbox"), Some(&"1"));
        assert_eq!(map.get("requires-darwin"), Some(&""));
        assert!(ExecutionRequirements::default().to_map().is_empty());
    }

    #[test]
    fn test_action_serializes_with_kind() {
        let action = Action::Copy(CopyAction {
            src: "a".into(),
            dst: "b".into(),
            mnemonic: "Copy".into(),
        });
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["kind"], "copy");
        assert_eq!(json["dst"], "b");
    }
}
