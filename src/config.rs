//! Defines [`Config`], the resolved build configuration. Site metadata comes
//! from `site.config.json` in the project root, overridden by the
//! environment (see [`crate::env`]).

use crate::env::Env;
use crate::tag::{TagMetaConfig, TagStyles, DEFAULT_TAG_COLOR};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// The name of the site config file that marks a project root.
pub const SITE_CONFIG_FILE: &str = "site.config.json";

const DEFAULT_SITE_URL: &str = "https://example.com";
const DEFAULT_SITE_NAME: &str = "Blog";
const DEFAULT_SITE_DESCRIPTION: &str = "Notes on the web, static sites and tooling";
const DEFAULT_SITE_LANGUAGE: &str = "zh-CN";

/// `site.config.json` as written. Every field is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfigFile {
    pub url: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub language: Option<String>,
    pub tag_colors: HashMap<String, String>,
    pub default_tag_color: Option<String>,
    pub tag_meta: HashMap<String, TagMetaConfig>,
}

impl SiteConfigFile {
    /// Reads `path`. A missing file is an empty config; so is a malformed one,
    /// after a warning.
    pub fn load(path: &Path) -> Result<SiteConfigFile> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SiteConfigFile::default())
            }
            Err(err) => {
                return Err(Error::Read {
                    path: path.to_owned(),
                    err,
                })
            }
        };
        match serde_json::from_str(&contents) {
            Ok(file) => Ok(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse site config, using defaults");
                Ok(SiteConfigFile::default())
            }
        }
    }
}

/// Site metadata consumed by the emitters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Site {
    /// The absolute site URL without a trailing slash.
    pub url: String,
    pub name: String,
    pub description: String,
    pub language: String,
    pub image: Option<String>,
    pub tags: TagStyles,
}

impl Site {
    /// Merges `file` and `env`; the environment wins.
    pub fn resolve(file: SiteConfigFile, env: &Env) -> Result<Site> {
        let url = normalize_site_url(
            env.first(&["VITE_SITE_URL", "SITE_URL"])
                .or_else(|| file.url.as_deref().filter(|s| !s.is_empty()))
                .unwrap_or(DEFAULT_SITE_URL),
        );
        Url::parse(&url).map_err(|err| Error::InvalidSiteUrl {
            url: url.clone(),
            err,
        })?;

        let pick = |keys: &[&str], configured: Option<String>, default: &str| -> String {
            env.first(keys)
                .map(str::to_owned)
                .or_else(|| configured.filter(|s| !s.is_empty()))
                .unwrap_or_else(|| default.to_owned())
        };

        let file_image = file.image;
        Ok(Site {
            name: pick(&["VITE_SITE_NAME"], file.name, DEFAULT_SITE_NAME),
            description: pick(
                &["VITE_SITE_DESCRIPTION"],
                file.description,
                DEFAULT_SITE_DESCRIPTION,
            ),
            language: pick(&["VITE_SITE_LANGUAGE"], file.language, DEFAULT_SITE_LANGUAGE),
            image: env
                .first(&["VITE_SITE_IMAGE"])
                .map(str::to_owned)
                .or_else(|| file_image.filter(|s| !s.is_empty())),
            tags: TagStyles {
                default_color: file
                    .default_tag_color
                    .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_owned()),
                colors: file.tag_colors,
                meta: file.tag_meta,
            },
            url,
        })
    }
}

/// Strips trailing slashes.
pub fn normalize_site_url(url: &str) -> String {
    url.trim_end_matches('/').to_owned()
}

/// The resolved build configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The directory containing `site.config.json` (or the starting directory
    /// when there is none).
    pub root_directory: PathBuf,

    /// `{root_directory}/posts`.
    pub posts_source_directory: PathBuf,

    /// Where the front-end build left its output and where the SEO artifacts
    /// go. Defaults to `{root_directory}/dist`.
    pub output_directory: PathBuf,

    pub site: Site,
}

impl Config {
    /// Searches `dir` and its ancestors for `site.config.json` and loads the
    /// configuration rooted there, with the process environment layered on
    /// top. If no ancestor has one, `dir` is the root and the site config is
    /// empty.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let root = find_project_root(dir).unwrap_or_else(|| dir.to_owned());
        debug!(root = %root.display(), "Resolved project root");
        let env = Env::load(&root).map_err(|err| Error::Read {
            path: root.clone(),
            err,
        })?;
        Config::from_parts(&root, &env)
    }

    /// Loads the configuration rooted at `root` using the given environment.
    pub fn from_parts(root: &Path, env: &Env) -> Result<Config> {
        let file = SiteConfigFile::load(&root.join(SITE_CONFIG_FILE))?;
        Ok(Config {
            root_directory: root.to_owned(),
            posts_source_directory: root.join("posts"),
            output_directory: root.join("dist"),
            site: Site::resolve(file, env)?,
        })
    }
}

fn find_project_root(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .find(|ancestor| ancestor.join(SITE_CONFIG_FILE).is_file())
        .map(Path::to_owned)
}

/// Represents the result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Config`].
#[derive(Debug)]
pub enum Error {
    /// Returned when a config or env file exists but can't be read.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when the resolved site URL isn't an absolute URL.
    InvalidSiteUrl { url: String, err: url::ParseError },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read { path, err } => {
                write!(f, "Loading configuration from '{}': {}", path.display(), err)
            }
            Error::InvalidSiteUrl { url, err } => {
                write!(f, "Invalid site URL `{}`: {}", url, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read { path: _, err } => Some(err),
            Error::InvalidSiteUrl { url: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() -> Result<()> {
        let site = Site::resolve(SiteConfigFile::default(), &Env::default())?;
        assert_eq!("https://example.com", site.url);
        assert_eq!("zh-CN", site.language);
        assert_eq!(DEFAULT_TAG_COLOR, site.tags.default_color);
        assert_eq!(None, site.image);
        Ok(())
    }

    #[test]
    fn test_env_beats_file() -> Result<()> {
        let file: SiteConfigFile = serde_json::from_str(
            r##"{"url": "https://file.dev///", "name": "File", "language": "en", "tagColors": {"SEO": "#2BD96B"}}"##,
        )
        .unwrap();
        let env: Env = vec![
            ("SITE_URL", "https://env.dev/"),
            ("VITE_SITE_NAME", "Env"),
        ]
        .into_iter()
        .collect();
        let site = Site::resolve(file, &env)?;
        assert_eq!("https://env.dev", site.url);
        assert_eq!("Env", site.name);
        assert_eq!("en", site.language);
        assert_eq!("#2BD96B", site.tags.color("SEO"));
        Ok(())
    }

    #[test]
    fn test_file_url_is_normalized() -> Result<()> {
        let file = SiteConfigFile {
            url: Some("https://blog.dev//".to_owned()),
            ..SiteConfigFile::default()
        };
        assert_eq!("https://blog.dev", Site::resolve(file, &Env::default())?.url);
        Ok(())
    }

    #[test]
    fn test_invalid_site_url() {
        let env: Env = vec![("SITE_URL", "not a url")].into_iter().collect();
        match Site::resolve(SiteConfigFile::default(), &env) {
            Err(Error::InvalidSiteUrl { url, .. }) => assert_eq!("not a url", url),
            other => panic!("expected InvalidSiteUrl, got {:?}", other),
        }
    }

    #[test]
    fn test_from_directory_walks_up_to_project_root() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let root = dir.path();
        fs::write(root.join(SITE_CONFIG_FILE), r#"{"name": "Walked"}"#)?;
        let nested = root.join("posts").join("技术");
        fs::create_dir_all(&nested)?;

        let config = Config::from_directory(&nested)?;
        assert_eq!(root, config.root_directory.as_path());
        assert_eq!(root.join("posts"), config.posts_source_directory);
        assert_eq!(root.join("dist"), config.output_directory);
        Ok(())
    }

    #[test]
    fn test_malformed_site_config_is_ignored() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(SITE_CONFIG_FILE), "{ not json")?;
        let config = Config::from_parts(dir.path(), &Env::default())?;
        assert_eq!("https://example.com", config.site.url);
        Ok(())
    }
}
