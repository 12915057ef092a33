/// Pin board synchronization
///
/// The board is shared, but the server never pushes changes: a background
/// task polls the pin list, and drags are applied locally at once and
/// written back after a short quiet period.
use crate::{
    board::{CreatePinRequest, Pin, Position, UpdatePinRequest},
    client::{ApiClient, ClientError, ClientResult, PinsFetch},
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, warn};

/// Pin operations the board needs from the server
#[async_trait]
pub trait PinTransport: Send + Sync {
    async fn fetch_pins(&self, etag: Option<&str>) -> ClientResult<PinsFetch>;
    async fn create_pin(&self, req: CreatePinRequest) -> ClientResult<Pin>;
    async fn update_pin(&self, req: UpdatePinRequest) -> ClientResult<Pin>;
    async fn toggle_pin_like(&self, id: &str) -> ClientResult<Pin>;
    async fn delete_pin(&self, id: &str) -> ClientResult<()>;

    /// Id of the signed-in user
    fn current_user_id(&self) -> Option<String>;
}

#[async_trait]
impl PinTransport for ApiClient {
    async fn fetch_pins(&self, etag: Option<&str>) -> ClientResult<PinsFetch> {
        ApiClient::fetch_pins(self, etag).await
    }

    async fn create_pin(&self, req: CreatePinRequest) -> ClientResult<Pin> {
        ApiClient::create_pin(self, &req).await
    }

    async fn update_pin(&self, req: UpdatePinRequest) -> ClientResult<Pin> {
        ApiClient::update_pin(self, &req).await
    }

    async fn toggle_pin_like(&self, id: &str) -> ClientResult<Pin> {
        ApiClient::toggle_pin_like(self, id).await
    }

    async fn delete_pin(&self, id: &str) -> ClientResult<()> {
        ApiClient::delete_pin(self, id).await
    }

    fn current_user_id(&self) -> Option<String> {
        ApiClient::current_user_id(self)
    }
}

/// Timing for polling and drag writes
#[derive(Debug, Clone, Copy)]
pub struct BoardSyncConfig {
    pub poll_interval: Duration,
    /// Quiet period after the last move of a pin before it is written
    pub debounce: Duration,
}

impl Default for BoardSyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            debounce: Duration::from_millis(300),
        }
    }
}

/// What the board currently shows
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pub pins: Vec<Pin>,
    /// Message of the last failed operation
    pub last_error: Option<String>,
    /// ETag of the last full list
    pub etag: Option<String>,
}

impl BoardState {
    pub fn pin(&self, id: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id == id)
    }

    fn pin_mut(&mut self, id: &str) -> Option<&mut Pin> {
        self.pins.iter_mut().find(|p| p.id == id)
    }

    fn replace_pin(&mut self, pin: Pin) {
        match self.pin_mut(&pin.id) {
            Some(existing) => *existing = pin,
            None => self.pins.push(pin),
        }
    }
}

struct PendingWrite {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Keeps a local copy of the board in step with the server
pub struct BoardSync<T: PinTransport + 'static> {
    transport: Arc<T>,
    config: BoardSyncConfig,
    state: Arc<RwLock<BoardState>>,
    pending: Arc<Mutex<HashMap<String, PendingWrite>>>,
    generation: AtomicU64,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl<T: PinTransport + 'static> BoardSync<T> {
    pub fn new(transport: Arc<T>, config: BoardSyncConfig) -> Self {
        Self {
            transport,
            config,
            state: Arc::new(RwLock::new(BoardState::default())),
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            poller: Mutex::new(None),
        }
    }

    /// Start polling. The first poll runs immediately.
    pub fn start(&self) {
        let mut poller = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        if poller.is_some() {
            return;
        }

        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);
        let period = self.config.poll_interval;

        *poller = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = refresh(transport.as_ref(), &state, false).await {
                    debug!("Pin poll failed: {}", e);
                }
            }
        }));
    }

    /// Stop polling. Pending moves are still written.
    pub fn stop(&self) {
        let mut poller = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = poller.take() {
            handle.abort();
        }
    }

    pub fn is_polling(&self) -> bool {
        let poller = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        poller.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Fetch now, skipping the download when the board is unchanged
    pub async fn refresh(&self) -> ClientResult<()> {
        refresh(self.transport.as_ref(), &self.state, false).await
    }

    pub async fn snapshot(&self) -> BoardState {
        self.state.read().await.clone()
    }

    pub async fn pins(&self) -> Vec<Pin> {
        self.state.read().await.pins.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.last_error = None;
    }

    /// Whether the signed-in user wrote this pin
    pub fn is_owner(&self, pin: &Pin) -> bool {
        self.transport.current_user_id().as_deref() == Some(pin.author_id.as_str())
    }

    /// Move a pin locally now and write the position once moves settle.
    ///
    /// A move within the quiet period of the previous one replaces its
    /// pending write, so only the final position is sent.
    pub async fn move_pin(&self, id: &str, position: Position) -> ClientResult<()> {
        let position = position.clamped().map_err(|e| ClientError::Api {
            status: 400,
            message: e.to_string(),
        })?;

        {
            let mut state = self.state.write().await;
            let pin = state.pin_mut(id).ok_or_else(|| ClientError::Unknown {
                kind: "pin",
                id: id.to_string(),
            })?;
            pin.position = position;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.remove(id) {
            previous.handle.abort();
        }

        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);
        let pending_writes = Arc::clone(&self.pending);
        let delay = self.config.debounce;
        let pin_id = id.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // From here on the write is in flight and no longer replaceable
            {
                let mut pending = pending_writes.lock().unwrap_or_else(|e| e.into_inner());
                if pending.get(&pin_id).map(|w| w.generation) == Some(generation) {
                    pending.remove(&pin_id);
                }
            }

            let request = UpdatePinRequest::move_to(pin_id.clone(), position);
            match transport.update_pin(request).await {
                Ok(pin) => state.write().await.replace_pin(pin),
                Err(e) => {
                    warn!("Failed to save position of pin {}: {}", pin_id, e);
                    state.write().await.last_error = Some(e.to_string());
                    let _ = refresh(transport.as_ref(), &state, true).await;
                }
            }
        });

        pending.insert(id.to_string(), PendingWrite { generation, handle });
        Ok(())
    }

    /// Wait until every scheduled position write has been sent
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain().map(|(_, write)| write.handle).collect()
        };

        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Raise a pin above all others
    pub async fn bring_to_front(&self, id: &str) -> ClientResult<Pin> {
        {
            let mut state = self.state.write().await;
            let top = state.pins.iter().map(|p| p.z_index).max().unwrap_or(0);
            if let Some(pin) = state.pin_mut(id) {
                if pin.z_index < top {
                    pin.z_index = top.saturating_add(1);
                }
            }
        }

        let request = UpdatePinRequest {
            id: id.to_string(),
            bring_to_front: true,
            ..Default::default()
        };
        match self.transport.update_pin(request).await {
            Ok(pin) => {
                self.state.write().await.replace_pin(pin.clone());
                Ok(pin)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Edit a pin's content, rotation or stacking and resync
    pub async fn update_pin(&self, req: UpdatePinRequest) -> ClientResult<Pin> {
        let result = self.transport.update_pin(req).await;
        self.settle(result).await
    }

    pub async fn create_pin(&self, req: CreatePinRequest) -> ClientResult<Pin> {
        let result = self.transport.create_pin(req).await;
        self.settle(result).await
    }

    pub async fn toggle_like(&self, id: &str) -> ClientResult<Pin> {
        let result = self.transport.toggle_pin_like(id).await;
        self.settle(result).await
    }

    pub async fn delete_pin(&self, id: &str) -> ClientResult<()> {
        if let Some(write) = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
        {
            write.handle.abort();
        }

        let result = self.transport.delete_pin(id).await;
        self.settle(result).await
    }

    /// Re-fetch after a server call, recording the error if it failed
    async fn settle<R>(&self, result: ClientResult<R>) -> ClientResult<R> {
        match result {
            Ok(value) => {
                if let Err(e) = refresh(self.transport.as_ref(), &self.state, true).await {
                    debug!("Refetch after pin change failed: {}", e);
                }
                Ok(value)
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn fail(&self, error: ClientError) -> ClientError {
        self.state.write().await.last_error = Some(error.to_string());
        let _ = refresh(self.transport.as_ref(), &self.state, true).await;
        error
    }
}

impl<T: PinTransport + 'static> Drop for BoardSync<T> {
    fn drop(&mut self) {
        self.stop();
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        for (_, write) in pending.drain() {
            write.handle.abort();
        }
    }
}

/// Replace local pins with the server's list. `force` skips the ETag, so
/// local changes the server never accepted are discarded.
async fn refresh<T: PinTransport + ?Sized>(
    transport: &T,
    state: &RwLock<BoardState>,
    force: bool,
) -> ClientResult<()> {
    let etag = if force {
        None
    } else {
        state.read().await.etag.clone()
    };

    match transport.fetch_pins(etag.as_deref()).await {
        Ok(PinsFetch::NotModified) => Ok(()),
        Ok(PinsFetch::Pins { pins, etag }) => {
            let mut state = state.write().await;
            state.pins = pins;
            state.etag = etag;
            Ok(())
        }
        Err(e) => {
            state.write().await.last_error = Some(e.to_string());
            Err(e)
        }
    }
}
