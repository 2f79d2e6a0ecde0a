//! Loads the build environment: `.env`-style files from the project root,
//! overridden by the process environment.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// The `.env` files read from the project root, lowest precedence first.
pub const ENV_FILES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.production",
    ".env.production.local",
];

/// A flat snapshot of environment variables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Env {
    vars: HashMap<String, String>,
}

impl Env {
    /// Reads [`ENV_FILES`] from `root` (missing files are skipped), then
    /// layers the process environment on top.
    pub fn load(root: &Path) -> io::Result<Env> {
        let mut env = Env::from_files(root)?;
        env.vars.extend(std::env::vars());
        Ok(env)
    }

    /// Reads only [`ENV_FILES`] from `root`, without the process environment.
    pub fn from_files(root: &Path) -> io::Result<Env> {
        let mut vars = HashMap::new();
        for name in ENV_FILES {
            let path = root.join(name);
            match fs::read_to_string(&path) {
                Ok(contents) => vars.extend(parse(&contents)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(Env { vars })
    }

    /// Returns the first of `keys` that is set to a non-empty value.
    pub fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.vars.get(*key))
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> std::iter::FromIterator<(K, V)> for Env {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Env {
        Env {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parses `KEY=value` lines. Blank lines, `#` comments and lines without `=`
/// are skipped; a value wrapped in double quotes is unwrapped.
fn parse(contents: &str) -> impl Iterator<Item = (String, String)> + '_ {
    contents.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let eq = line.find('=')?;
        let key = line[..eq].trim();
        if key.is_empty() {
            return None;
        }
        let mut value = line[eq + 1..].trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }
        Some((key.to_owned(), value.to_owned()))
    })
}
