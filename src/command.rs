//! Operations run off the caller's thread, with periodic status reporting.
//!
//! An [`Executor`] runs one [`Operation`] at a time on a background thread.
//! While it works, a [`StatusBoard`] keeps the latest status text visible by
//! re-issuing it to the presenter on a fixed interval. Every announcement
//! bumps a generation counter, so a newer status or a clear silently
//! supersedes the older one.

use crate::error::Result;
use crate::index::build::{reset_index, sync_index, update_single, FileUpdate};
use crate::index::sync::ApplyReport;
use crate::output::Presenter;
use crate::query::{search, Fragment, SearchHistory};
use crate::utils::{Project, Settings};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Something the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Rebuild the index from scratch
    Reset,
    /// Incrementally bring the index up to date
    Sync,
    /// Phrase search
    Search(String),
    /// Re-index one saved file
    UpdateSingle(PathBuf),
}

impl Operation {
    fn describe(&self, project: &Project) -> String {
        match self {
            Operation::Reset => format!("Rebuilding index of {}", project.name),
            Operation::Sync => format!("Indexing {}", project.name),
            Operation::Search(phrase) => format!("Searching for \"{}\"", phrase),
            Operation::UpdateSingle(path) => format!("Updating {}", path.display()),
        }
    }
}

/// What a finished operation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Indexed(ApplyReport),
    Searched { documents: usize, fragments: usize },
    Updated(FileUpdate),
}

/// Proof of one announcement; stale once anything newer is announced
#[derive(Debug, Clone)]
pub struct StatusToken {
    generation: Arc<AtomicU64>,
    version: u64,
}

impl StatusToken {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.version
    }
}

struct BoardState {
    text: Option<String>,
    reporter_running: bool,
}

struct BoardInner {
    generation: Arc<AtomicU64>,
    state: Mutex<BoardState>,
    presenter: Arc<dyn Presenter>,
    interval: Duration,
}

impl BoardInner {
    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps the most recent status visible until superseded or cleared
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<BoardInner>,
}

impl StatusBoard {
    pub fn new(presenter: Arc<dyn Presenter>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(BoardInner {
                generation: Arc::new(AtomicU64::new(0)),
                state: Mutex::new(BoardState {
                    text: None,
                    reporter_running: false,
                }),
                presenter,
                interval: interval.max(Duration::from_millis(10)),
            }),
        }
    }

    /// Current generation; bumped by every announce and clear
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Show `text` now and keep re-issuing it every interval
    pub fn announce(&self, text: impl Into<String>) -> StatusToken {
        let text = text.into();
        let mut state = self.inner.state();
        let version = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Err(e) = self.inner.presenter.show_progress(&text) {
            log::debug!("status update failed: {}", e);
        }
        state.text = Some(text);

        if !state.reporter_running {
            state.reporter_running = true;
            let weak = Arc::downgrade(&self.inner);
            let interval = self.inner.interval;
            thread::spawn(move || report(weak, interval));
        }

        StatusToken {
            generation: Arc::clone(&self.inner.generation),
            version,
        }
    }

    /// Remove the status; the reporter stops at its next tick
    pub fn clear(&self) {
        let mut state = self.inner.state();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        state.text = None;

        if let Err(e) = self.inner.presenter.clear() {
            log::debug!("clearing status failed: {}", e);
        }
    }
}

/// Periodic reporter loop; exits once there is nothing to show
fn report(board: Weak<BoardInner>, interval: Duration) {
    loop {
        thread::sleep(interval);

        let Some(inner) = board.upgrade() else {
            return;
        };
        let mut state = inner.state();
        match &state.text {
            Some(text) => {
                if let Err(e) = inner.presenter.show_progress(text) {
                    log::debug!("status update failed: {}", e);
                }
            }
            None => {
                state.reporter_running = false;
                return;
            }
        }
    }
}

impl Presenter for StatusBoard {
    fn show_progress(&self, status: &str) -> io::Result<()> {
        self.announce(status);
        Ok(())
    }

    fn append_result(&self, path: &Path, fragment: &Fragment<'_>) -> io::Result<()> {
        self.inner.presenter.append_result(path, fragment)
    }

    fn clear(&self) -> io::Result<()> {
        StatusBoard::clear(self);
        Ok(())
    }
}

/// Runs operations for one project
#[derive(Clone)]
pub struct Executor {
    project: Arc<Project>,
    settings: Arc<Settings>,
    presenter: Arc<dyn Presenter>,
    status: StatusBoard,
}

impl Executor {
    pub fn new(project: Project, settings: Settings, presenter: Arc<dyn Presenter>) -> Self {
        let interval = Duration::from_millis(settings.status_interval_ms);
        Self {
            status: StatusBoard::new(Arc::clone(&presenter), interval),
            project: Arc::new(project),
            settings: Arc::new(settings),
            presenter,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Run `op` on a background thread
    pub fn spawn(&self, op: Operation) -> JoinHandle<Result<Outcome>> {
        let executor = self.clone();
        thread::spawn(move || executor.run(op))
    }

    /// Run `op` on the calling thread.
    ///
    /// A failure is reported to the presenter as one status message and
    /// returned to the caller.
    pub fn run(&self, op: Operation) -> Result<Outcome> {
        self.status.announce(format!("{}...", op.describe(&self.project)));

        let result = self.dispatch(&op);
        self.status.clear();

        if let Err(e) = &result {
            if e.is_recoverable() {
                log::info!("{}", e);
            } else {
                log::error!("{} failed: {}", op.describe(&self.project), e);
            }
            if let Err(io_err) = self.presenter.show_progress(&format!("phrasedex: {}", e)) {
                log::debug!("status update failed: {}", io_err);
            }
        }

        result
    }

    fn dispatch(&self, op: &Operation) -> Result<Outcome> {
        let project = &*self.project;
        let settings = &*self.settings;

        match op {
            Operation::Reset => reset_index(project, settings, &self.status).map(Outcome::Indexed),
            Operation::Sync => sync_index(project, settings, &self.status).map(Outcome::Indexed),
            Operation::UpdateSingle(path) => {
                update_single(project, path, settings, &self.status).map(Outcome::Updated)
            }
            Operation::Search(phrase) => self.search(phrase),
        }
    }

    fn search(&self, phrase: &str) -> Result<Outcome> {
        let matches = search(&self.project, phrase)?;
        self.record(phrase);

        // Results replace the status line
        self.status.clear();

        let mut fragments = 0;
        for document in &matches {
            for fragment in document.fragments() {
                self.presenter.append_result(&document.path, &fragment)?;
                fragments += 1;
            }
        }

        Ok(Outcome::Searched {
            documents: matches.len(),
            fragments,
        })
    }

    /// Remember the phrase in the project's search history
    fn record(&self, phrase: &str) {
        let result = self.project.index_dir().and_then(|index_path| {
            let mut history = SearchHistory::load(&index_path, self.settings.history_size)?;
            history.push(phrase);
            history.save(&index_path)
        });

        if let Err(e) = result {
            log::warn!("could not update search history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Presenter for Recorder {
        fn show_progress(&self, status: &str) -> io::Result<()> {
            self.events.lock().unwrap().push(status.to_string());
            Ok(())
        }

        fn append_result(&self, path: &Path, fragment: &Fragment<'_>) -> io::Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:{}", path.display(), fragment.as_str()));
            Ok(())
        }

        fn clear(&self) -> io::Result<()> {
            self.events.lock().unwrap().push("<clear>".into());
            Ok(())
        }
    }

    #[test]
    fn test_tokens_are_superseded() {
        let recorder = Arc::new(Recorder::default());
        let board = StatusBoard::new(recorder.clone(), Duration::from_secs(60));

        let first = board.announce("one");
        assert!(first.is_current());

        let second = board.announce("two");
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.version() > first.version());

        board.clear();
        assert!(!second.is_current());
        assert_eq!(recorder.events(), vec!["one", "two", "<clear>"]);
    }

    #[test]
    fn test_reporter_repeats_until_superseded() {
        let recorder = Arc::new(Recorder::default());
        let board = StatusBoard::new(recorder.clone(), Duration::from_millis(20));

        board.announce("working");
        thread::sleep(Duration::from_millis(150));
        board.announce("finishing");
        thread::sleep(Duration::from_millis(100));
        board.clear();

        let events = recorder.events();
        let switch = events.iter().position(|e| e == "finishing").unwrap();
        assert!(events[..switch].iter().filter(|e| *e == "working").count() >= 2);
        assert!(events[switch..].iter().all(|e| e != "working"));

        // Nothing is re-issued after the clear
        thread::sleep(Duration::from_millis(100));
        assert_eq!(recorder.events().last().map(String::as_str), Some("<clear>"));
    }
}
