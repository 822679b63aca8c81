//! # Process Description
//!
//! The process command line and the package the app was launched from.
//!
//! Switches are `--name` or `--name=value` (a single leading `-` is also
//! accepted). A bare `--` ends switch parsing; everything after it is
//! positional.

use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    original_argv: Vec<String>,
    switches: HashMap<String, Option<String>>,
    args: Vec<String>,
}

impl CommandLine {
    pub fn from_argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let original_argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let mut switches = HashMap::new();
        let mut args = Vec::new();
        let mut switches_done = false;

        for arg in original_argv.iter().skip(1) {
            if switches_done {
                args.push(arg.clone());
                continue;
            }
            if arg == "--" {
                switches_done = true;
                continue;
            }
            match switch_body(arg) {
                Some(body) => {
                    let (name, value) = match body.split_once('=') {
                        Some((name, value)) => (name, Some(value.to_string())),
                        None => (body, None),
                    };
                    switches.insert(name.to_string(), value);
                }
                None => args.push(arg.clone()),
            }
        }

        Self {
            original_argv,
            switches,
            args,
        }
    }

    /// Command line of the running process
    pub fn current() -> Self {
        Self::from_argv(std::env::args())
    }

    /// Every argument as given, program name first
    pub fn original_argv(&self) -> &[String] {
        &self.original_argv
    }

    /// Positional (non-switch) arguments, program name excluded
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn has_switch(&self, name: &str) -> bool {
        self.switches.contains_key(name)
    }

    pub fn switch_value(&self, name: &str) -> Option<&str> {
        self.switches.get(name).and_then(|v| v.as_deref())
    }

    /// Arguments exposed to the app script.
    ///
    /// The program name is dropped. Unless the package is self-extracting,
    /// the first positional argument is the package path and its first
    /// occurrence in argv is dropped too.
    pub fn script_visible_argv(&self, package: &Package) -> Vec<String> {
        let package_arg = if package.self_extract {
            None
        } else {
            self.args.first()
        };
        let mut skip_pending = package_arg.is_some();

        self.original_argv
            .iter()
            .skip(1)
            .filter(|arg| {
                if skip_pending && Some(*arg) == package_arg {
                    skip_pending = false;
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }
}

fn switch_body(arg: &str) -> Option<&str> {
    let body = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-'))?;
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}

/// The package the app was loaded from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    /// Package is embedded in the executable; argv carries no package path
    pub self_extract: bool,
    pub path: Option<PathBuf>,
}

impl Package {
    pub fn new(self_extract: bool) -> Self {
        Self {
            self_extract,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}
