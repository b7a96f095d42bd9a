//! Template expansion.
//!
//! Templates are Handlebars documents rendered with HTML escaping disabled,
//! since their outputs are shell scripts and property lists.

use crate::error::{Error, ErrorExt, Result};
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Name of the embedded process-and-sign script template.
pub const PROCESS_AND_SIGN: &str = "process_and_sign.sh";

/// Name of the embedded dSYM Info.plist template.
pub const DSYM_INFO_PLIST: &str = "dsym_info_plist";

fn embedded_text(name: &str) -> Result<&'static str> {
    match name {
        PROCESS_AND_SIGN => Ok(include_str!("../templates/process_and_sign.sh.template")),
        DSYM_INFO_PLIST => Ok(include_str!("../templates/dsym_info_plist.template")),
        _ => Err(Error::Unsupported {
            kind: "embedded template",
            value: name.to_string(),
        }),
    }
}

fn new_registry() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);
    handlebars
}

/// Where a template's text comes from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    /// One of the templates compiled into the crate
    Embedded(&'static str),
    /// A user-provided template file
    File(PathBuf),
}

/// Renders `template` with `substitutions`.
///
/// Every placeholder in the template must have a substitution.
pub fn render(template: &Template, substitutions: &BTreeMap<String, String>) -> Result<String> {
    match template {
        Template::Embedded(name) => {
            Ok(new_registry().render_template(embedded_text(name)?, substitutions)?)
        }
        Template::File(path) => {
            let text = std::fs::read_to_string(path).fs_context("reading template", path)?;
            Ok(new_registry().render_template(&text, substitutions)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_template_not_escaped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "echo {{{{value}}}}").unwrap();

        let substitutions = BTreeMap::from([("value".to_string(), "\"a & b\"".to_string())]);
        let rendered = render(&Template::File(file.path().to_path_buf()), &substitutions).unwrap();
        assert_eq!(rendered, "echo \"a & b\"");
    }

    #[test]
    fn test_unknown_embedded_template() {
        let err = render(&Template::Embedded("nope"), &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_missing_substitution_is_an_error() {
        let substitutions = BTreeMap::new();
        assert!(render(&Template::Embedded(DSYM_INFO_PLIST), &substitutions).is_err());
    }
}
