//! The content-loading state machine behind the article page:
//!
//! ```text
//! Idle -> Loading -> Loaded | NotFound | Error
//! ```
//!
//! Every navigation that needs a fetch is issued a [`LoadTicket`] carrying a
//! monotonically increasing token. Only a completion whose token is the
//! latest one issued is applied; anything older is a superseded navigation
//! and is dropped without being treated as an error. Loaded content is cached
//! by canonical id so revisiting a post skips `Loading` entirely.

use crate::frontmatter::Frontmatter;
use crate::index::{PostIndex, PostMeta};
use crate::markdown::{self, TocItem};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// A post body ready for display.
#[derive(Clone, Debug, PartialEq)]
pub struct PostContent {
    pub id: String,
    pub frontmatter: Frontmatter,
    pub html: String,
    pub toc: Vec<TocItem>,
}

/// Fetches post bodies. The loader never calls this on its own; callers
/// drive it through [`ContentLoader::fetch`] or [`ContentLoader::load`].
pub trait ContentSource {
    fn load(&self, post: &PostMeta) -> Result<PostContent>;
}

impl<T: ContentSource + ?Sized> ContentSource for &T {
    fn load(&self, post: &PostMeta) -> Result<PostContent> {
        (**self).load(post)
    }
}

/// Reads post bodies from the project directory and renders them.
pub struct FsContentSource {
    /// The directory [`PostMeta::path`] is relative to.
    root_directory: PathBuf,
}

impl FsContentSource {
    pub fn new(root_directory: &Path) -> FsContentSource {
        FsContentSource {
            root_directory: root_directory.to_owned(),
        }
    }
}

impl ContentSource for FsContentSource {
    fn load(&self, post: &PostMeta) -> Result<PostContent> {
        let path = self.root_directory.join(post.path.trim_start_matches('/'));
        let contents = std::fs::read_to_string(&path).map_err(|err| Error::Read {
            path: path.clone(),
            err,
        })?;
        let (frontmatter, body) = Frontmatter::parse_lenient(&post.id, &contents);
        let rendered = markdown::to_html(body).map_err(Error::Render)?;
        Ok(PostContent {
            id: post.id.clone(),
            frontmatter,
            html: rendered.html,
            toc: rendered.toc,
        })
    }
}

/// What the article view should show.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadState {
    Idle,
    Loading {
        id: String,
    },
    Loaded {
        id: String,
        content: Rc<PostContent>,
    },
    NotFound {
        category_slug: String,
        article_slug: String,
    },
    /// The fetch failed or stalled; the view shows no content.
    Error {
        id: String,
        message: String,
    },
}

/// A claim on the result of one navigation. Completing a ticket that has
/// been superseded is a no-op.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadTicket {
    token: u64,
    id: String,
}

impl LoadTicket {
    /// The canonical id being loaded.
    pub fn id(&self) -> &str {
        &self.id
    }
}

type Listener<'a> = Box<dyn FnMut(&LoadState) + 'a>;

/// Owns the article view's loading state. All mutation goes through
/// `&mut self`; there is exactly one current load at a time.
pub struct ContentLoader<'a, S> {
    index: &'a PostIndex,
    source: S,
    state: LoadState,
    latest_token: u64,
    loading_since: Option<Instant>,
    timeout: Option<Duration>,
    cache: HashMap<String, Rc<PostContent>>,
    listeners: Vec<Listener<'a>>,
}

impl<'a, S: ContentSource> ContentLoader<'a, S> {
    pub fn new(index: &'a PostIndex, source: S) -> Self {
        ContentLoader {
            index,
            source,
            state: LoadState::Idle,
            latest_token: 0,
            loading_since: None,
            timeout: None,
            cache: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    /// Loads that stay in `Loading` longer than `timeout` are failed by
    /// [`ContentLoader::expire_stalled`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Registers `listener` to be called with every state transition.
    pub fn subscribe<F: FnMut(&LoadState) + 'a>(&mut self, listener: F) {
        self.listeners.push(Box::new(listener));
    }

    /// Whether content for `id` is already cached.
    pub fn is_cached(&self, id: &str) -> bool {
        self.cache.contains_key(id)
    }

    /// Handles a change of route parameters. Returns a ticket when the
    /// caller needs to fetch content; returns `None` when the new state was
    /// decided synchronously (not found, cached, or already showing).
    pub fn navigate(&mut self, category_slug: &str, article_slug: &str) -> Option<LoadTicket> {
        let id = if category_slug.is_empty() || article_slug.is_empty() {
            None
        } else {
            self.index
                .resolve_post_id_by_slug(category_slug, article_slug)
                .map(str::to_owned)
        };

        let id = match id {
            Some(id) => id,
            None => {
                warn!(category_slug, article_slug, "Article not found");
                self.invalidate();
                self.set_state(LoadState::NotFound {
                    category_slug: category_slug.to_owned(),
                    article_slug: article_slug.to_owned(),
                });
                return None;
            }
        };

        if let LoadState::Loaded { id: current, .. } = &self.state {
            if *current == id {
                return None;
            }
        }

        let token = self.invalidate();
        if let Some(content) = self.cache.get(&id).cloned() {
            debug!(id = %id, "Serving cached content");
            self.set_state(LoadState::Loaded { id, content });
            return None;
        }

        self.loading_since = Some(Instant::now());
        self.set_state(LoadState::Loading { id: id.clone() });
        Some(LoadTicket { token, id })
    }

    /// Runs the content source for `ticket`.
    pub fn fetch(&self, ticket: &LoadTicket) -> Result<PostContent> {
        match self.index.get(&ticket.id) {
            Some(post) => self.source.load(post),
            None => Err(Error::NotIndexed(ticket.id.clone())),
        }
    }

    /// Applies the outcome of a fetch. Returns `false`, leaving the state
    /// untouched, if `ticket` has been superseded by a later navigation.
    pub fn complete(&mut self, ticket: LoadTicket, result: Result<PostContent>) -> bool {
        if ticket.token != self.latest_token {
            debug!(id = %ticket.id, token = ticket.token, "Discarding stale load");
            return false;
        }

        self.loading_since = None;
        match result {
            Ok(content) => {
                let content = Rc::new(content);
                self.cache.insert(ticket.id.clone(), Rc::clone(&content));
                self.set_state(LoadState::Loaded {
                    id: ticket.id,
                    content,
                });
            }
            Err(e) => {
                error!(id = %ticket.id, error = %e, "Failed to load article");
                self.set_state(LoadState::Error {
                    id: ticket.id,
                    message: e.to_string(),
                });
            }
        }
        true
    }

    /// Navigates and, if needed, fetches and applies the content in one go.
    pub fn load(&mut self, category_slug: &str, article_slug: &str) -> &LoadState {
        if let Some(ticket) = self.navigate(category_slug, article_slug) {
            let result = self.fetch(&ticket);
            self.complete(ticket, result);
        }
        &self.state
    }

    /// Fails the current load if it has been `Loading` for longer than the
    /// configured timeout as of `now`. Its ticket is invalidated, so a late
    /// result is dropped. Returns whether anything expired.
    pub fn expire_stalled(&mut self, now: Instant) -> bool {
        let (timeout, since) = match (self.timeout, self.loading_since) {
            (Some(timeout), Some(since)) => (timeout, since),
            _ => return false,
        };
        if now.saturating_duration_since(since) < timeout {
            return false;
        }
        let id = match &self.state {
            LoadState::Loading { id } => id.clone(),
            _ => return false,
        };

        warn!(id = %id, timeout_ms = timeout.as_millis() as u64, "Article load timed out");
        self.invalidate();
        self.set_state(LoadState::Error {
            id,
            message: format!("timed out after {:?}", timeout),
        });
        true
    }

    /// Issues a fresh token, superseding any in-flight ticket.
    fn invalidate(&mut self) -> u64 {
        self.latest_token += 1;
        self.loading_since = None;
        self.latest_token
    }

    fn set_state(&mut self, state: LoadState) {
        self.state = state;
        for listener in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }
}

/// Represents the result of a content-loading operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a post body.
#[derive(Debug)]
pub enum Error {
    /// Returned when the post source file couldn't be read.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when rendering the Markdown body failed.
    Render(std::io::Error),

    /// Returned when a ticket refers to an id that isn't in the index.
    NotIndexed(String),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read { path, err } => {
                write!(f, "reading post '{}': {}", path.display(), err)
            }
            Error::Render(err) => write!(f, "rendering post: {}", err),
            Error::NotIndexed(id) => write!(f, "post `{}` is not indexed", id),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read { path: _, err } => Some(err),
            Error::Render(err) => Some(err),
            Error::NotIndexed(_) => None,
        }
    }
}
