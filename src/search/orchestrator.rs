//! Search orchestration
//!
//! Owns the results page state and runs the two fetch effects: text search
//! keyed by (query, page) and image search keyed by the uploaded file. Each
//! effect kind carries a generation counter; a response is only applied if
//! its generation is still current (unless stale discarding is turned off).

use super::backend::SearchBackend;
use super::models::{SearchQuery, UploadedFile};
use crate::config::SearchSettings;
use crate::error::FetchError;
use crate::metrics::{FetchKind, Metrics};
use crate::results::{
    format_image_results, ImageResultsView, PaginationView, ResultPayload, ResultsFormatter,
    ResultsView, SearchStatus,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of the most recent fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchStatus {
    /// Nothing fetched yet
    #[default]
    Idle,
    Loading,
    Loaded,
    /// The last settled fetch failed; prior results are still shown
    Failed(FetchError),
}

/// What a single effect run ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutcome {
    /// Precondition not met, nothing was requested
    Skipped,
    Loaded,
    Failed(FetchError),
    /// A newer fetch of the same kind was triggered; the response was dropped
    Discarded,
}

/// Snapshot of everything the page renders from
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    pub query: SearchQuery,
    /// Name of the uploaded image, if any
    pub file_name: Option<String>,
    pub status: SearchStatus,
    pub loading: bool,
    /// Round-trip time of the last applied fetch, in seconds
    pub elapsed: f64,
    pub results: ResultPayload,
    pub total_pages: u64,
    outcome: FetchStatus,
}

impl DisplayState {
    pub fn page(&self) -> u32 {
        self.query.page
    }

    pub fn fetch_status(&self) -> FetchStatus {
        if self.loading {
            FetchStatus::Loading
        } else {
            self.outcome.clone()
        }
    }

    /// Result list, or `None` when another status view is active
    pub fn results_view(&self, formatter: &ResultsFormatter) -> Option<ResultsView> {
        formatter.format(Some(&self.results), self.elapsed, &self.status)
    }

    pub fn image_view(&self) -> Option<ImageResultsView> {
        format_image_results(Some(&self.results), &self.status)
    }

    pub fn pagination(&self) -> PaginationView {
        PaginationView::new(self.query.page, self.total_pages)
    }
}

#[derive(Debug, Default)]
struct EffectSlot {
    generation: u64,
    /// Fetches issued and not yet settled, current or not
    pending: u32,
    current_settled: bool,
}

impl EffectSlot {
    fn is_busy(&self, discard_stale: bool) -> bool {
        if discard_stale {
            self.generation > 0 && !self.current_settled
        } else {
            self.pending > 0
        }
    }
}

struct Inner {
    display: DisplayState,
    file: Option<Arc<UploadedFile>>,
    text: EffectSlot,
    image: EffectSlot,
    /// Bumped on every user status change
    status_revision: u64,
}

impl Inner {
    fn slot(&mut self, kind: FetchKind) -> &mut EffectSlot {
        match kind {
            FetchKind::Text => &mut self.text,
            FetchKind::Image => &mut self.image,
        }
    }
}

/// Taken when a fetch starts, handed back when it settles
#[derive(Debug, Clone, Copy)]
struct Ticket {
    kind: FetchKind,
    generation: u64,
    status_revision: u64,
    started: Instant,
}

struct Shared {
    backend: Arc<dyn SearchBackend>,
    page_size: u32,
    discard_stale: bool,
    inner: Mutex<Inner>,
    updates: watch::Sender<DisplayState>,
    metrics: Arc<Metrics>,
}

/// Results page orchestrator.
///
/// Cloning is cheap and every clone drives the same state. Setters that
/// trigger a fetch spawn it on the current tokio runtime and return its
/// handle; `run_*` methods fetch inline instead.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    /// Create a new orchestrator over a backend
    pub fn new(backend: Arc<dyn SearchBackend>, settings: &SearchSettings) -> Self {
        let display = DisplayState {
            query: SearchQuery {
                query: None,
                page: 1,
            },
            ..Default::default()
        };
        let (updates, _) = watch::channel(display.clone());

        Self {
            shared: Arc::new(Shared {
                backend,
                page_size: settings.page_size.max(1),
                discard_stale: settings.discard_stale_responses,
                inner: Mutex::new(Inner {
                    display,
                    file: None,
                    text: EffectSlot::default(),
                    image: EffectSlot::default(),
                    status_revision: 0,
                }),
                updates,
                metrics: Arc::new(Metrics::new()),
            }),
        }
    }

    /// Limit sent with image searches
    pub fn image_limit(&self) -> u32 {
        self.shared.page_size.saturating_mul(2)
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.shared.metrics
    }

    /// Current display state
    pub fn state(&self) -> DisplayState {
        self.lock().display.clone()
    }

    /// Receive a fresh snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.shared.updates.subscribe()
    }

    /// Change the query text; re-runs text search if it differs
    pub fn set_query(&self, query: Option<String>) -> Option<JoinHandle<EffectOutcome>> {
        let page = self.lock().display.query.page;
        self.navigate(SearchQuery { query, page })
    }

    /// Change the page; re-runs text search if it differs
    pub fn set_page(&self, page: u32) -> Option<JoinHandle<EffectOutcome>> {
        let query = self.lock().display.query.query.clone();
        self.navigate(SearchQuery { query, page })
    }

    /// Replace query and page together, triggering at most one text search
    pub fn navigate(&self, key: SearchQuery) -> Option<JoinHandle<EffectOutcome>> {
        let key = SearchQuery {
            page: key.page.max(1),
            ..key
        };
        let started = {
            let mut inner = self.lock();
            if inner.display.query == key {
                return None;
            }
            inner.display.query = key;
            let started = self.begin_text(&mut inner);
            if started.is_none() {
                // a blank query supersedes whatever text fetch is in flight
                self.supersede(&mut inner, FetchKind::Text);
                self.publish(&inner);
            }
            started
        };

        started.map(|(query, page, ticket)| {
            let this = self.clone();
            tokio::spawn(async move { this.fetch_text(query, page, ticket).await })
        })
    }

    /// Set or clear the uploaded image. Every new file triggers image search.
    pub fn set_file(&self, file: Option<UploadedFile>) -> Option<JoinHandle<EffectOutcome>> {
        let started = {
            let mut inner = self.lock();
            inner.display.file_name = file.as_ref().map(|f| f.file_name.clone());
            inner.file = file.map(Arc::new);
            let started = self.begin_image(&mut inner);
            if started.is_none() {
                self.publish(&inner);
            }
            started
        };

        started.map(|(file, ticket)| {
            let this = self.clone();
            tokio::spawn(async move { this.fetch_image(file, ticket).await })
        })
    }

    /// Switch the visible result view (sidebar filter)
    pub fn set_status(&self, status: SearchStatus) {
        let mut inner = self.lock();
        inner.status_revision += 1;
        if inner.display.status != status {
            debug!("Status changed to {}", status);
            inner.display.status = status;
        }
        self.publish(&inner);
    }

    /// Run text search for the current query and page, waiting for it to settle
    pub async fn run_text_search(&self) -> EffectOutcome {
        let started = {
            let mut inner = self.lock();
            self.begin_text(&mut inner)
        };
        match started {
            Some((query, page, ticket)) => self.fetch_text(query, page, ticket).await,
            None => EffectOutcome::Skipped,
        }
    }

    /// Run image search for the current file, waiting for it to settle
    pub async fn run_image_search(&self) -> EffectOutcome {
        let started = {
            let mut inner = self.lock();
            self.begin_image(&mut inner)
        };
        match started {
            Some((file, ticket)) => self.fetch_image(file, ticket).await,
            None => EffectOutcome::Skipped,
        }
    }

    fn begin_text(&self, inner: &mut Inner) -> Option<(String, u32, Ticket)> {
        let query = match inner.display.query.active_query() {
            Some(q) => q.to_string(),
            None => {
                debug!("Empty query, skipping text search");
                return None;
            }
        };
        let page = inner.display.query.page;
        let ticket = self.begin(inner, FetchKind::Text);
        Some((query, page, ticket))
    }

    fn begin_image(&self, inner: &mut Inner) -> Option<(Arc<UploadedFile>, Ticket)> {
        let file = inner.file.clone()?;
        let ticket = self.begin(inner, FetchKind::Image);
        Some((file, ticket))
    }

    fn supersede(&self, inner: &mut Inner, kind: FetchKind) {
        let slot = inner.slot(kind);
        if slot.generation > 0 {
            slot.generation += 1;
            slot.current_settled = true;
        }
        self.refresh_loading(inner);
    }

    fn refresh_loading(&self, inner: &mut Inner) {
        let discard_stale = self.shared.discard_stale;
        inner.display.loading =
            inner.text.is_busy(discard_stale) || inner.image.is_busy(discard_stale);
    }

    fn begin(&self, inner: &mut Inner, kind: FetchKind) -> Ticket {
        let slot = inner.slot(kind);
        slot.generation += 1;
        slot.pending += 1;
        slot.current_settled = false;
        let generation = slot.generation;

        inner.display.loading = true;
        inner.display.elapsed = 0.0;
        self.publish(inner);
        self.shared.metrics.record_issued(kind);

        Ticket {
            kind,
            generation,
            status_revision: inner.status_revision,
            started: Instant::now(),
        }
    }

    async fn fetch_text(&self, query: String, page: u32, ticket: Ticket) -> EffectOutcome {
        let limit = self.shared.page_size;
        info!("Searching '{}' page {} (limit {})", query, page, limit);

        let result = self.shared.backend.search(&query, page, limit).await;
        if let Ok(ref payload) = result {
            if payload.docs.len() > limit as usize {
                warn!(
                    "Backend returned {} docs for a page of {}",
                    payload.docs.len(),
                    limit
                );
            }
        }
        self.settle(ticket, result)
    }

    async fn fetch_image(&self, file: Arc<UploadedFile>, ticket: Ticket) -> EffectOutcome {
        let limit = self.image_limit();
        info!(
            "Searching similar images for '{}' ({} bytes, limit {})",
            file.file_name,
            file.len(),
            limit
        );

        let result = self.shared.backend.search_images(&file, limit).await;
        self.settle(ticket, result)
    }

    fn settle(&self, ticket: Ticket, result: Result<ResultPayload, FetchError>) -> EffectOutcome {
        let elapsed_ms = ticket.started.elapsed().as_millis() as u64;
        let metrics = &self.shared.metrics;

        let mut inner = self.lock();
        let discard_stale = self.shared.discard_stale;
        let slot = inner.slot(ticket.kind);
        slot.pending = slot.pending.saturating_sub(1);
        let current = slot.generation == ticket.generation;
        if current {
            slot.current_settled = true;
        }

        if !current && discard_stale {
            debug!(
                "Dropping stale {} response (generation {}, current {})",
                ticket.kind, ticket.generation, slot.generation
            );
            metrics.record_stale(ticket.kind);
            return EffectOutcome::Discarded;
        }

        let outcome = match result {
            Ok(payload) => {
                metrics.record_success(ticket.kind, elapsed_ms);
                debug!(
                    "{} search settled in {}ms with {} docs",
                    ticket.kind,
                    elapsed_ms,
                    payload.docs.len()
                );
                inner.display.total_pages = payload.total_pages(self.shared.page_size);
                inner.display.results = payload;
                if ticket.kind == FetchKind::Image {
                    if inner.status_revision == ticket.status_revision {
                        inner.display.status = SearchStatus::Images;
                    } else {
                        debug!("Status changed during image search, keeping {}", inner.display.status);
                    }
                }
                inner.display.outcome = FetchStatus::Loaded;
                EffectOutcome::Loaded
            }
            Err(err) => {
                metrics.record_failure(ticket.kind, elapsed_ms);
                error!("Error fetching {} search results: {}", ticket.kind, err);
                inner.display.outcome = FetchStatus::Failed(err.clone());
                EffectOutcome::Failed(err)
            }
        };

        inner.display.elapsed = elapsed_ms as f64 / 1000.0;
        self.refresh_loading(&mut inner);
        self.publish(&inner);

        outcome
    }

    fn publish(&self, inner: &Inner) {
        self.shared.updates.send_replace(inner.display.clone());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.shared.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Document;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::oneshot;

    type Reply = Result<ResultPayload, FetchError>;

    /// Backend that answers immediately unless a gate is registered for the
    /// page (or for image search), in which case it waits for the test to
    /// release the response.
    #[derive(Default)]
    struct FakeBackend {
        text_reply: Mutex<Option<Reply>>,
        image_reply: Mutex<Option<Reply>>,
        text_gates: Mutex<HashMap<u32, oneshot::Receiver<Reply>>>,
        image_gate: Mutex<Option<oneshot::Receiver<Reply>>>,
        text_calls: Mutex<Vec<(String, u32, u32)>>,
        image_calls: Mutex<Vec<(String, u32)>>,
    }

    impl FakeBackend {
        fn replying(reply: Reply) -> Self {
            let backend = Self::default();
            *backend.text_reply.lock().unwrap() = Some(reply.clone());
            *backend.image_reply.lock().unwrap() = Some(reply);
            backend
        }

        fn gate_page(&self, page: u32) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.text_gates.lock().unwrap().insert(page, rx);
            tx
        }

        fn gate_image(&self) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            *self.image_gate.lock().unwrap() = Some(rx);
            tx
        }

        fn text_calls(&self) -> Vec<(String, u32, u32)> {
            self.text_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchBackend for FakeBackend {
        async fn search(&self, query: &str, page: u32, limit: u32) -> Reply {
            self.text_calls
                .lock()
                .unwrap()
                .push((query.to_string(), page, limit));
            let gate = self.text_gates.lock().unwrap().remove(&page);
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(FetchError::Network("gate dropped".into()))),
                None => self
                    .text_reply
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| Ok(ResultPayload::default())),
            }
        }

        async fn search_images(&self, file: &UploadedFile, limit: u32) -> Reply {
            self.image_calls
                .lock()
                .unwrap()
                .push((file.file_name.clone(), limit));
            let gate = self.image_gate.lock().unwrap().take();
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(FetchError::Network("gate dropped".into()))),
                None => self
                    .image_reply
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| Ok(ResultPayload::default())),
            }
        }
    }

    fn settings(discard_stale: bool) -> SearchSettings {
        SearchSettings {
            page_size: 10,
            discard_stale_responses: discard_stale,
        }
    }

    fn payload(total: u64, titles: &[&str]) -> ResultPayload {
        ResultPayload::new(
            total,
            titles
                .iter()
                .map(|t| Document::new(format!("https://example.com/{}", t), *t))
                .collect(),
        )
    }

    fn titles(state: &DisplayState) -> Vec<String> {
        state
            .results
            .docs
            .iter()
            .filter_map(|d| d.title.clone())
            .collect()
    }

    fn image() -> UploadedFile {
        UploadedFile::new("cat.png", vec![1, 2, 3])
    }

    #[tokio::test]
    async fn test_blank_query_issues_no_request() {
        let backend = Arc::new(FakeBackend::replying(Ok(payload(5, &["a"]))));
        let orch = Orchestrator::new(backend.clone(), &settings(true));

        for blank in ["", "   ", "\t\n"] {
            assert!(orch.set_query(Some(blank.to_string())).is_none());
        }
        assert!(orch.set_query(None).is_none());
        assert_eq!(orch.run_text_search().await, EffectOutcome::Skipped);

        assert!(backend.text_calls().is_empty());
        let state = orch.state();
        assert_eq!(state.results, ResultPayload::default());
        assert!(!state.loading);
        assert_eq!(state.fetch_status(), FetchStatus::Idle);
    }

    #[tokio::test]
    async fn test_text_search_success() {
        let backend = Arc::new(FakeBackend::replying(Ok(payload(23, &["a", "b", "c"]))));
        let orch = Orchestrator::new(backend.clone(), &settings(true));

        let handle = orch.set_query(Some("rust".to_string())).unwrap();
        assert_eq!(handle.await.unwrap(), EffectOutcome::Loaded);

        let state = orch.state();
        assert_eq!(state.total_pages, 3);
        assert_eq!(titles(&state), vec!["a", "b", "c"]);
        assert!(!state.loading);
        assert!(state.elapsed >= 0.0);
        assert_eq!(state.fetch_status(), FetchStatus::Loaded);
        assert_eq!(backend.text_calls(), vec![("rust".to_string(), 1, 10)]);
    }

    #[tokio::test]
    async fn test_total_pages_is_ceiling() {
        for (total, pages) in [(0, 0), (1, 1), (10, 1), (11, 2), (95, 10), (100, 10)] {
            let backend = Arc::new(FakeBackend::replying(Ok(payload(total, &[]))));
            let orch = Orchestrator::new(backend, &settings(true));
            orch.set_query(Some("q".to_string())).unwrap().await.unwrap();
            assert_eq!(orch.state().total_pages, pages, "total {}", total);
        }
    }

    #[tokio::test]
    async fn test_failure_keeps_prior_results() {
        let backend = Arc::new(FakeBackend::replying(Ok(payload(2, &["kept"]))));
        let orch = Orchestrator::new(backend.clone(), &settings(true));
        orch.set_query(Some("first".to_string()))
            .unwrap()
            .await
            .unwrap();

        *backend.text_reply.lock().unwrap() = Some(Err(FetchError::Status(500)));
        let outcome = orch.set_page(2).unwrap().await.unwrap();
        assert_eq!(outcome, EffectOutcome::Failed(FetchError::Status(500)));

        let state = orch.state();
        assert_eq!(titles(&state), vec!["kept"]);
        assert_eq!(state.total_pages, 1);
        assert_eq!(state.page(), 2);
        assert!(!state.loading);
        assert!(state.elapsed >= 0.0);
        assert_eq!(
            state.fetch_status(),
            FetchStatus::Failed(FetchError::Status(500))
        );
    }

    #[tokio::test]
    async fn test_loading_flips_once_per_effect() {
        let backend = Arc::new(FakeBackend::default());
        let gate = backend.gate_page(1);
        let orch = Orchestrator::new(backend, &settings(true));
        let mut updates = orch.subscribe();
        updates.borrow_and_update();

        let handle = orch.set_query(Some("rust".to_string())).unwrap();
        let state = orch.state();
        assert!(state.loading);
        assert_eq!(state.elapsed, 0.0);
        assert_eq!(state.fetch_status(), FetchStatus::Loading);
        assert!(updates.has_changed().unwrap());
        assert!(updates.borrow_and_update().loading);

        gate.send(Ok(payload(1, &["a"]))).unwrap();
        handle.await.unwrap();
        assert!(updates.has_changed().unwrap());
        assert!(!updates.borrow_and_update().loading);
        assert!(!updates.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_unchanged_key_does_not_refetch() {
        let backend = Arc::new(FakeBackend::replying(Ok(payload(1, &["a"]))));
        let orch = Orchestrator::new(backend.clone(), &settings(true));

        orch.set_query(Some("rust".to_string()))
            .unwrap()
            .await
            .unwrap();
        assert!(orch.set_query(Some("rust".to_string())).is_none());
        assert!(orch.set_page(1).is_none());
        // page 0 clamps to 1
        assert!(orch.set_page(0).is_none());
        assert_eq!(backend.text_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let backend = Arc::new(FakeBackend::default());
        let page1 = backend.gate_page(1);
        let page2 = backend.gate_page(2);
        let orch = Orchestrator::new(backend, &settings(true));

        let first = orch.set_query(Some("rust".to_string())).unwrap();
        let second = orch.set_page(2).unwrap();

        page2.send(Ok(payload(20, &["page2"]))).unwrap();
        assert_eq!(second.await.unwrap(), EffectOutcome::Loaded);
        assert!(!orch.state().loading);

        page1.send(Ok(payload(20, &["page1"]))).unwrap();
        assert_eq!(first.await.unwrap(), EffectOutcome::Discarded);

        let state = orch.state();
        assert_eq!(titles(&state), vec!["page2"]);
        assert!(!state.loading);
        let stats = orch.metrics().stats(FetchKind::Text);
        assert_eq!(
            (stats.issued, stats.succeeded, stats.failed, stats.stale),
            (2, 1, 0, 1)
        );
    }

    #[tokio::test]
    async fn test_clearing_query_drops_in_flight_response() {
        let backend = Arc::new(FakeBackend::default());
        let gate = backend.gate_page(1);
        let orch = Orchestrator::new(backend, &settings(true));

        let handle = orch.set_query(Some("rust".to_string())).unwrap();
        assert!(orch.state().loading);
        assert!(orch.set_query(None).is_none());
        assert!(!orch.state().loading);

        gate.send(Ok(payload(1, &["rust-hit"]))).unwrap();
        assert_eq!(handle.await.unwrap(), EffectOutcome::Discarded);

        let state = orch.state();
        assert_eq!(state.query.query, None);
        assert!(state.results.is_empty());
        assert!(!state.loading);
        assert_eq!(state.fetch_status(), FetchStatus::Idle);
        assert_eq!(orch.metrics().stats(FetchKind::Text).stale, 1);
    }

    #[tokio::test]
    async fn test_clearing_query_keeps_last_arrival_without_discard() {
        let backend = Arc::new(FakeBackend::default());
        let gate = backend.gate_page(1);
        let orch = Orchestrator::new(backend, &settings(false));

        let handle = orch.set_query(Some("rust".to_string())).unwrap();
        assert!(orch.set_query(None).is_none());
        assert!(orch.state().loading);

        gate.send(Ok(payload(1, &["rust-hit"]))).unwrap();
        assert_eq!(handle.await.unwrap(), EffectOutcome::Loaded);
        assert!(!orch.state().loading);
    }

    #[tokio::test]
    async fn test_oversized_page_is_kept_whole() {
        let names: Vec<String> = (0..12).map(|i| format!("doc{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let backend = Arc::new(FakeBackend::replying(Ok(payload(30, &refs))));
        let orch = Orchestrator::new(backend.clone(), &settings(true));

        let outcome = orch.set_query(Some("big".to_string())).unwrap().await.unwrap();
        assert_eq!(outcome, EffectOutcome::Loaded);

        let state = orch.state();
        assert_eq!(backend.text_calls(), vec![("big".to_string(), 1, 10)]);
        assert_eq!(state.results.docs.len(), 12);
        assert_eq!(titles(&state).last().map(String::as_str), Some("doc11"));
        assert_eq!(state.total_pages, 3);
    }

    #[tokio::test]
    async fn test_stale_response_keeps_loading_until_current_settles() {
        let backend = Arc::new(FakeBackend::default());
        let page1 = backend.gate_page(1);
        let page2 = backend.gate_page(2);
        let orch = Orchestrator::new(backend, &settings(true));

        let first = orch.set_query(Some("rust".to_string())).unwrap();
        let second = orch.set_page(2).unwrap();

        page1.send(Ok(payload(20, &["page1"]))).unwrap();
        assert_eq!(first.await.unwrap(), EffectOutcome::Discarded);
        let state = orch.state();
        assert!(state.loading);
        assert!(state.results.is_empty());

        page2.send(Ok(payload(20, &["page2"]))).unwrap();
        second.await.unwrap();
        assert_eq!(titles(&orch.state()), vec!["page2"]);
    }

    #[tokio::test]
    async fn test_last_arrival_wins_without_discard() {
        let backend = Arc::new(FakeBackend::default());
        let page1 = backend.gate_page(1);
        let page2 = backend.gate_page(2);
        let orch = Orchestrator::new(backend, &settings(false));

        let first = orch.set_query(Some("rust".to_string())).unwrap();
        let second = orch.set_page(2).unwrap();

        page2.send(Ok(payload(20, &["page2"]))).unwrap();
        second.await.unwrap();
        // page 1 is still in flight
        assert!(orch.state().loading);

        page1.send(Ok(payload(20, &["page1"]))).unwrap();
        assert_eq!(first.await.unwrap(), EffectOutcome::Loaded);

        let state = orch.state();
        assert_eq!(titles(&state), vec!["page1"]);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_image_search_switches_to_images() {
        let backend = Arc::new(FakeBackend::replying(Ok(payload(4, &["img"]))));
        let orch = Orchestrator::new(backend.clone(), &settings(true));
        assert_eq!(orch.state().status, SearchStatus::All);

        let outcome = orch.set_file(Some(image())).unwrap().await.unwrap();
        assert_eq!(outcome, EffectOutcome::Loaded);

        let state = orch.state();
        assert_eq!(state.status, SearchStatus::Images);
        assert_eq!(titles(&state), vec!["img"]);
        assert_eq!(state.total_pages, 1);
        assert_eq!(state.query, SearchQuery { query: None, page: 1 });
        assert_eq!(state.file_name.as_deref(), Some("cat.png"));
        assert!(backend.text_calls().is_empty());
        assert_eq!(
            *backend.image_calls.lock().unwrap(),
            vec![("cat.png".to_string(), 20)]
        );
    }

    #[tokio::test]
    async fn test_image_failure_keeps_status() {
        let backend = Arc::new(FakeBackend::replying(Err(FetchError::Network(
            "refused".into(),
        ))));
        let orch = Orchestrator::new(backend, &settings(true));

        let outcome = orch.set_file(Some(image())).unwrap().await.unwrap();
        assert!(matches!(outcome, EffectOutcome::Failed(_)));
        let state = orch.state();
        assert_eq!(state.status, SearchStatus::All);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_user_status_change_during_image_search_is_respected() {
        let backend = Arc::new(FakeBackend::default());
        let gate = backend.gate_image();
        let orch = Orchestrator::new(backend, &settings(true));

        let handle = orch.set_file(Some(image())).unwrap();
        orch.set_status(SearchStatus::All);
        gate.send(Ok(payload(3, &["img"]))).unwrap();
        handle.await.unwrap();

        let state = orch.state();
        assert_eq!(state.status, SearchStatus::All);
        assert_eq!(titles(&state), vec!["img"]);
    }

    #[tokio::test]
    async fn test_clearing_file_does_not_fetch() {
        let backend = Arc::new(FakeBackend::default());
        let orch = Orchestrator::new(backend.clone(), &settings(true));
        assert!(orch.set_file(None).is_none());
        assert_eq!(orch.run_image_search().await, EffectOutcome::Skipped);
        assert!(backend.image_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_and_image_are_independent() {
        let backend = Arc::new(FakeBackend::default());
        let text_gate = backend.gate_page(1);
        let image_gate = backend.gate_image();
        let orch = Orchestrator::new(backend, &settings(true));

        let text = orch.set_query(Some("cats".to_string())).unwrap();
        let img = orch.set_file(Some(image())).unwrap();

        image_gate.send(Ok(payload(2, &["img"]))).unwrap();
        assert_eq!(img.await.unwrap(), EffectOutcome::Loaded);
        assert!(orch.state().loading);

        text_gate.send(Ok(payload(7, &["text"]))).unwrap();
        assert_eq!(text.await.unwrap(), EffectOutcome::Loaded);

        // the text response settled last and owns the payload
        let state = orch.state();
        assert_eq!(titles(&state), vec!["text"]);
        assert_eq!(state.status, SearchStatus::Images);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_views_follow_status() {
        let backend = Arc::new(FakeBackend::replying(Ok(payload(23, &["a", "b", "c"]))));
        let orch = Orchestrator::new(backend, &settings(true));
        orch.set_query(Some("rust".to_string()))
            .unwrap()
            .await
            .unwrap();

        let state = orch.state();
        let view = state.results_view(&ResultsFormatter::default()).unwrap();
        assert!(view.summary.starts_with("About 23 results"));
        assert_eq!(view.items.len(), 3);
        assert!(state.image_view().is_none());
        assert_eq!(state.pagination().pages, vec![1, 2, 3]);

        orch.set_status(SearchStatus::Images);
        let state = orch.state();
        assert!(state.results_view(&ResultsFormatter::default()).is_none());
        assert!(state.image_view().is_some());
        // status filter never clears results
        assert_eq!(state.results.docs.len(), 3);
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let backend = Arc::new(FakeBackend::replying(Ok(payload(1, &["a"]))));
        let orch = Orchestrator::new(backend, &settings(true));
        orch.set_query(Some("rust".to_string()))
            .unwrap()
            .await
            .unwrap();
        orch.set_file(Some(image())).unwrap().await.unwrap();

        let text = orch.metrics().stats(FetchKind::Text);
        assert_eq!((text.issued, text.succeeded, text.failed), (1, 1, 0));
        let image = orch.metrics().stats(FetchKind::Image);
        assert_eq!((image.issued, image.succeeded), (1, 1));
    }
}
