use anyhow::Result;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::filter::{parse_win_chance, CaptureFilter, DEFAULT_WIN_CHANCE};
use super::lookup::{poll_until, RetryPolicy};
use super::message::{CaptureEvent, InboundMessage, OutboundMessage};
use crate::game::ResultNormalizer;
use crate::store::{AggregateSnapshot, AggregateStore, HostContext, KeyValueHost};

#[derive(Debug, Clone, Default)]
pub struct PageState {
    pub url: Option<String>,
    pub win_chance_input: Option<String>,
    // Set once the monitor has found the input; after that every change
    // is pushed out as an update.
    pub win_chance_attached: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub received: u64,
    pub filtered: u64,
    pub unparsed: u64,
    pub stored: u64,
    pub failed: u64,
}

pub struct CaptureRelay<H: KeyValueHost> {
    normalizer: ResultNormalizer,
    store: Arc<AggregateStore<H>>,
    filter: CaptureFilter,
    context: HostContext,
    page: Arc<Mutex<PageState>>,
    outbound: mpsc::Sender<OutboundMessage>,
    stats: RelayStats,
}

impl<H: KeyValueHost + 'static> CaptureRelay<H> {
    pub fn new(
        normalizer: ResultNormalizer,
        store: Arc<AggregateStore<H>>,
        filter: CaptureFilter,
        context: HostContext,
        outbound: mpsc::Sender<OutboundMessage>,
    ) -> Self {
        Self {
            normalizer,
            store,
            filter,
            context,
            page: Arc::new(Mutex::new(PageState::default())),
            outbound,
            stats: RelayStats::default(),
        }
    }

    pub fn with_page_url(self, url: Option<String>) -> Self {
        self.update_page(|page| page.url = url);
        self
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    pub fn page(&self) -> PageState {
        self.page.lock().map(|page| page.clone()).unwrap_or_default()
    }

    /// Processes messages one at a time until the stream ends. Each append
    /// completes before the next message is looked at, so results land in
    /// the order their responses arrived.
    pub async fn run<S>(&mut self, mut inbound: S, win_chance_policy: RetryPolicy) -> Result<RelayStats>
    where
        S: Stream<Item = InboundMessage> + Unpin,
    {
        info!("Capture relay started for {}", self.filter.site_origin());

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        let monitor = self.attach_win_chance_monitor(win_chance_policy, async move {
            let _ = shutdown_rx.changed().await;
        });

        while let Some(message) = inbound.next().await {
            self.handle(message).await;
        }

        let _ = shutdown_tx.send(true);
        if let Err(e) = monitor.await {
            warn!("Win chance monitor ended abnormally: {}", e);
        }

        info!("Capture relay stopped: {:?}", self.stats());
        Ok(self.stats())
    }

    pub fn attach_win_chance_monitor<C>(&self, policy: RetryPolicy, cancel: C) -> JoinHandle<()>
    where
        C: Future<Output = ()> + Send + 'static,
    {
        let page = self.page.clone();
        let outbound = self.outbound.clone();

        tokio::spawn(async move {
            let probe_page = page.clone();
            let probe = move || {
                let page = probe_page.clone();
                async move {
                    page.lock()
                        .ok()
                        .and_then(|page| page.win_chance_input.clone())
                }
            };

            match poll_until(&policy, probe, cancel).await {
                Ok(input) => {
                    if let Ok(mut page) = page.lock() {
                        page.win_chance_attached = true;
                    }
                    let win_chance = parse_win_chance(&input);
                    debug!("Win chance input found: {}", win_chance);
                    let _ = outbound.send(OutboundMessage::WinChanceUpdate { win_chance }).await;
                }
                Err(e) => debug!("Win chance input not attached: {}", e),
            }
        })
    }

    pub async fn handle(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::CasinoResponse { data } => self.handle_capture(data).await,
            InboundMessage::RequestUrlStatus => {
                if let Some(url) = self.page().url {
                    self.emit_url_status(url).await;
                }
            }
            InboundMessage::GetWinChance => {
                let win_chance = self
                    .page()
                    .win_chance_input
                    .as_deref()
                    .map_or(DEFAULT_WIN_CHANCE, parse_win_chance);
                self.emit(OutboundMessage::WinChanceUpdate { win_chance }).await;
            }
            InboundMessage::ClearData => match self.store.clear().await {
                Ok(()) => {
                    self.emit(OutboundMessage::StorageChanged {
                        snapshot: AggregateSnapshot::default(),
                    })
                    .await
                }
                Err(e) => error!("Failed to clear stored results: {}", e),
            },
            InboundMessage::TabUpdated { url, status } => {
                self.update_page(|page| page.url = Some(url.clone()));
                if status.as_deref() == Some("complete") {
                    self.emit_url_status(url).await;
                }
            }
            InboundMessage::WinChanceInput { value } => {
                let attached = self.update_page(|page| {
                    page.win_chance_input = Some(value.clone());
                    page.win_chance_attached
                });
                if attached == Some(true) {
                    let win_chance = parse_win_chance(&value);
                    self.emit(OutboundMessage::WinChanceUpdate { win_chance }).await;
                }
            }
        }
    }

    async fn handle_capture(&mut self, event: CaptureEvent) {
        self.stats.received += 1;

        if let Err(e) = self.context.check("while processing capture") {
            warn!("Cannot process capture: {}", e);
            self.stats.failed += 1;
            return;
        }

        let page_url = match self.page().url {
            Some(url) if self.filter.is_target_site(&url) => url,
            _ => {
                debug!("Dropping capture from {}: page is outside the site", event.url);
                self.stats.filtered += 1;
                return;
            }
        };

        if !event.data.is_object()
            || !self.filter.is_game_related_url(&event.url)
            || !self.filter.is_json_content(event.content_type.as_deref())
        {
            debug!("Dropping non-game capture from {} {}", event.method, event.url);
            self.stats.filtered += 1;
            return;
        }

        let Some(result) = self.normalizer.normalize(&event.data, &page_url) else {
            info!("Couldn't parse game result from {}", event.url);
            self.stats.unparsed += 1;
            return;
        };

        let round = result.round_id;
        let game = result.game_type;
        match self.store.append(result).await {
            Ok(snapshot) => {
                self.stats.stored += 1;
                info!(
                    "Game result saved: {} round {:?} ({} games, {:.2}% wins)",
                    game, round, snapshot.total_games, snapshot.win_rate
                );
                self.emit(OutboundMessage::StorageChanged { snapshot }).await;
            }
            Err(e) if e.is_context_invalidated() => {
                self.stats.failed += 1;
                warn!("Extension context invalidated, could not save game result: {}", e);
            }
            Err(e) => {
                self.stats.failed += 1;
                error!("Error saving game result: {}", e);
            }
        }
    }

    async fn emit_url_status(&self, url: String) {
        let is_target_site = self.filter.is_target_site(&url);
        self.emit(OutboundMessage::UrlStatus { is_target_site, url }).await;
    }

    async fn emit(&self, message: OutboundMessage) {
        if let Err(e) = self.outbound.send(message).await {
            debug!("Outbound channel closed: {}", e);
        }
    }

    fn update_page<R>(&self, update: impl FnOnce(&mut PageState) -> R) -> Option<R> {
        match self.page.lock() {
            Ok(mut page) => Some(update(&mut page)),
            Err(e) => {
                error!("Page state lock poisoned: {}", e);
                None
            }
        }
    }
}
