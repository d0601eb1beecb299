//! Client-side authentication state and route guards
//!
//! The token lives in a `TokenStore`; `AuthSession` keeps a logged-in flag
//! derived from it. Guards decide whether an app route renders or redirects.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Persistent storage for the auth token
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str) -> Result<()>;
    fn remove(&self) -> Result<()>;
}

/// Token store kept in memory
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.slot().clone()
    }

    fn set(&self, token: &str) -> Result<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

/// Token store backed by a file, shared by every process that reads it
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        let token = std::fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    /// Writes through a temporary file so readers never see a partial token
    fn set(&self, token: &str) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let mut file = tempfile::NamedTempFile::new_in(&dir).context("Failed to create temporary token file")?;
        std::io::Write::write_all(&mut file, token.as_bytes()).context("Failed to write token")?;
        file.persist(&self.path)
            .with_context(|| format!("Failed to store token in {}", self.path.display()))?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

struct SessionInner {
    store: Arc<dyn TokenStore>,
    logged_in: AtomicBool,
}

/// Logged-in state shared by the client and the route guards
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

impl AuthSession {
    /// Start a session from whatever token the store already holds
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let logged_in = store.get().is_some();
        Self {
            inner: Arc::new(SessionInner {
                store,
                logged_in: AtomicBool::new(logged_in),
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    pub fn login(&self, token: &str) -> Result<()> {
        self.inner.store.set(token)?;
        self.inner.logged_in.store(true, Ordering::SeqCst);
        tracing::debug!("Session logged in");
        Ok(())
    }

    /// Forget the token, both in memory and in the store
    pub fn logout(&self) -> Result<()> {
        self.inner.logged_in.store(false, Ordering::SeqCst);
        self.inner.store.remove()?;
        tracing::debug!("Session logged out");
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.inner.store.get()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.logged_in.load(Ordering::SeqCst)
    }

    /// Re-read the store after another writer changed it; returns the new flag
    pub fn refresh_from_store(&self) -> bool {
        let logged_in = self.inner.store.get().is_some();
        self.inner.logged_in.store(logged_in, Ordering::SeqCst);
        logged_in
    }
}

// ============================================================================
// Route guards
// ============================================================================

/// Pages of the web app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Settings,
    Editor,
    EditArticle(String),
    Article(String),
    Profile(String),
}

/// Access rule of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Only for logged-in users; others go to `/login`
    Protected,
    /// Only for anonymous users; logged-in users go to `/`
    PublicOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(String),
    NotFound,
}

impl Route {
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Route::Home),
            ["login"] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            ["settings"] => Some(Route::Settings),
            ["editor"] => Some(Route::Editor),
            ["editor", slug] => Some(Route::EditArticle(slug.to_string())),
            ["article", slug] => Some(Route::Article(slug.to_string())),
            ["profile", username] => Some(Route::Profile(username.to_string())),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Settings => "/settings".to_string(),
            Route::Editor => "/editor".to_string(),
            Route::EditArticle(slug) => format!("/editor/{}", slug),
            Route::Article(slug) => format!("/article/{}", slug),
            Route::Profile(username) => format!("/profile/{}", username),
        }
    }

    pub fn guard(&self) -> Option<Guard> {
        match self {
            Route::Settings | Route::Editor | Route::EditArticle(_) => Some(Guard::Protected),
            Route::Login | Route::Register => Some(Guard::PublicOnly),
            Route::Home | Route::Article(_) | Route::Profile(_) => None,
        }
    }
}

impl Guard {
    /// Where a user with the given login state ends up, or `None` to render
    pub fn redirect(self, logged_in: bool) -> Option<Route> {
        match (self, logged_in) {
            (Guard::Protected, false) => Some(Route::Login),
            (Guard::PublicOnly, true) => Some(Route::Home),
            _ => None,
        }
    }
}

/// Decide what navigating to `path` shows
pub fn resolve(path: &str, session: &AuthSession) -> Navigation {
    let Some(route) = Route::parse(path) else {
        return Navigation::NotFound;
    };

    match route.guard().and_then(|g| g.redirect(session.is_logged_in())) {
        Some(target) => Navigation::Redirect(target.path()),
        None => Navigation::Render(route),
    }
}
