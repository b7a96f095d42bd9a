//! Signing tool command assembly.
//!
//! The same token list is rendered two ways. [`codesign_args`] returns a
//! tokenized argument vector for direct process execution, with no quoting.
//! [`codesign_shell_args`] quotes every token for embedding in a shell
//! script: path tokens are double quoted so `$WORK_DIR`-style references
//! still expand, everything else is strictly shell quoted.

use super::path::PathToSign;
use crate::error::{Error, Result};
use crate::platform::PlatformPrerequisites;
use std::path::Path;

/// The system signing tool driven by the signing wrapper.
pub const SYSTEM_CODESIGN: &str = "/usr/bin/codesign";

/// Identity token for ad-hoc signing.
pub const ADHOC_IDENTITY: &str = "-";

/// Inputs shared by every path signed for one target.
#[derive(Clone, Debug)]
pub struct SigningContext<'a> {
    /// Platform facts of the build
    pub platform: &'a PlatformPrerequisites,
    /// Entitlements file, if any
    pub entitlements: Option<&'a Path>,
    /// Provisioning profile, if any
    pub provisioning_profile: Option<&'a Path>,
    /// Identity to use on simulator builds instead of the ad-hoc identity
    pub identity_override: Option<&'a str>,
    /// Extra options forwarded to `codesign` after `--`
    pub codesign_opts: &'a [String],
}

impl<'a> SigningContext<'a> {
    /// A context with no entitlements, profile or extra options.
    pub fn new(platform: &'a PlatformPrerequisites) -> Self {
        Self {
            platform,
            entitlements: None,
            provisioning_profile: None,
            identity_override: None,
            codesign_opts: &[],
        }
    }

    /// Resolves the identity to pass with `--identity`.
    ///
    /// `None` means the provisioning profile is passed instead.
    fn identity(&self) -> Option<&'a str> {
        if !self.platform.is_device() {
            return Some(self.identity_override.unwrap_or(ADHOC_IDENTITY));
        }

        match (
            self.identity_override
                .or(self.platform.signing_identity.as_deref())
                .filter(|identity| !identity.is_empty()),
            self.provisioning_profile,
        ) {
            (Some(identity), _) => Some(identity),
            (None, Some(_)) => None,
            (None, None) => Some(ADHOC_IDENTITY),
        }
    }
}

/// How a token is rendered into a shell string.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    /// Strict shell quoting
    Plain(String),
    /// Double quoting, leaving `$VAR` expandable
    Path(String),
}

impl Token {
    fn into_arg(self) -> String {
        match self {
            Token::Plain(s) | Token::Path(s) => s,
        }
    }

    fn into_shell(self) -> Result<String> {
        match self {
            Token::Plain(s) => shlex::try_quote(&s)
                .map(|quoted| quoted.into_owned())
                .map_err(|e| Error::GenericError(format!("cannot quote '{s}': {e}"))),
            Token::Path(s) => Ok(double_quote(&s)),
        }
    }
}

fn plain(s: impl Into<String>) -> Token {
    Token::Plain(s.into())
}

fn path_token(p: &Path) -> Token {
    Token::Path(p.to_string_lossy().into_owned())
}

/// Wraps `raw` in double quotes, escaping everything except `$`.
pub fn double_quote(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for c in raw.chars() {
        if matches!(c, '"' | '\\' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn codesign_tokens(path_to_sign: &PathToSign, context: &SigningContext<'_>) -> Result<Vec<Token>> {
    path_to_sign.validate()?;

    let is_device = context.platform.is_device();
    let mut tokens = vec![plain("--codesign"), plain(SYSTEM_CODESIGN)];

    match context.identity() {
        Some(identity) => tokens.extend([plain("--identity"), plain(identity)]),
        None => {
            if let Some(profile) = context.provisioning_profile {
                tokens.extend([plain("--mobileprovision"), path_token(profile)]);
            }
        }
    }

    if is_device
        && path_to_sign.use_entitlements
        && let Some(entitlements) = context.entitlements
    {
        tokens.extend([plain("--entitlements"), path_token(entitlements)]);
    }

    tokens.push(plain("--force"));
    if !is_device {
        tokens.push(plain("--disable_timestamp"));
    }

    if path_to_sign.is_directory {
        tokens.push(plain("--directory_to_sign"));
    } else {
        tokens.push(plain("--target_to_sign"));
    }
    tokens.push(Token::Path(path_to_sign.path.clone()));

    for framework in &path_to_sign.signed_frameworks {
        tokens.extend([plain("--signed_path"), Token::Path(framework.clone())]);
    }

    if !context.codesign_opts.is_empty() {
        tokens.push(plain("--"));
        tokens.extend(context.codesign_opts.iter().cloned().map(Token::Plain));
    }

    Ok(tokens)
}

/// Signing tool arguments as an unquoted argument vector.
pub fn codesign_args(path_to_sign: &PathToSign, context: &SigningContext<'_>) -> Result<Vec<String>> {
    Ok(codesign_tokens(path_to_sign, context)?
        .into_iter()
        .map(Token::into_arg)
        .collect())
}

/// Signing tool arguments, each quoted for a later shell stage.
pub fn codesign_shell_args(
    path_to_sign: &PathToSign,
    context: &SigningContext<'_>,
) -> Result<Vec<String>> {
    codesign_tokens(path_to_sign, context)?
        .into_iter()
        .map(Token::into_shell)
        .collect()
}

/// A full shell command line invoking `tool` on `path_to_sign`.
pub fn codesign_command_line(
    tool: &Path,
    path_to_sign: &PathToSign,
    context: &SigningContext<'_>,
) -> Result<String> {
    let mut command = vec![path_token(tool).into_shell()?];
    command.extend(codesign_shell_args(path_to_sign, context)?);
    Ok(command.join(" "))
}

/// One signing command per path, newline separated.
pub fn signing_command_lines(
    tool: &Path,
    paths_to_sign: &[PathToSign],
    context: &SigningContext<'_>,
) -> Result<String> {
    let commands = paths_to_sign
        .iter()
        .map(|path| codesign_command_line(tool, path, context))
        .collect::<Result<Vec<_>>>()?;
    Ok(commands.join("\n"))
}
