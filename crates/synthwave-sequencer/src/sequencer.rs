use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::dispatch::Dispatcher;
use crate::error::SequencerError;
use crate::random::RandomSource;
use crate::session::{SchedulerSession, SessionOptions, UiUpdate, UI_QUEUE_CAPACITY};
use crate::store::PatternStore;
use crate::transport::{SubscriptionId, TransportClock};

/// Play/stop control around a shared [`PatternStore`].
///
/// The running session sits behind a mutex shared with the transport
/// callback; ticks that arrive after `stop` find no session and are dropped.
/// UI updates go through a bounded outbox; a host that stops draining it
/// loses updates, never memory.
pub struct Sequencer {
    store: Arc<PatternStore>,
    dispatcher: Dispatcher,
    options: SessionOptions,
    session: Arc<Mutex<Option<SchedulerSession>>>,
    subscription: Option<SubscriptionId>,
    ui_tx: Sender<UiUpdate>,
    ui_rx: Receiver<UiUpdate>,
}

impl Sequencer {
    pub fn new(store: Arc<PatternStore>, dispatcher: Dispatcher) -> Self {
        let (ui_tx, ui_rx) = bounded(UI_QUEUE_CAPACITY);
        Self {
            store,
            dispatcher,
            options: SessionOptions::default(),
            session: Arc::new(Mutex::new(None)),
            subscription: None,
            ui_tx,
            ui_rx,
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &Arc<PatternStore> {
        &self.store
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Takes effect on the next `start`. The look-ahead always comes from the
    /// transport the sequencer is started on.
    pub fn set_options(&mut self, options: SessionOptions) {
        self.options = options;
    }

    pub fn is_playing(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn ui_updates(&self) -> Receiver<UiUpdate> {
        self.ui_rx.clone()
    }

    pub fn start(
        &mut self,
        transport: &mut dyn TransportClock,
        rng: Box<dyn RandomSource + Send>,
    ) -> Result<(), SequencerError> {
        let mut slot = self.session.lock();
        if slot.is_some() {
            return Err(SequencerError::AlreadyPlaying);
        }
        let session = SchedulerSession::start(
            self.store.clone(),
            self.dispatcher.clone(),
            transport.tempo_handle(),
            rng,
            SessionOptions {
                lookahead: transport.lookahead(),
                ..self.options
            },
            self.ui_tx.clone(),
        );
        let subdivision = session.subdivision();
        *slot = Some(session);
        drop(slot);

        let shared = self.session.clone();
        let id = transport.subscribe(
            subdivision,
            Box::new(move |step_time| match shared.lock().as_mut() {
                Some(session) => {
                    session.on_tick(step_time);
                }
                None => tracing::trace!(step_time, "tick ignored while stopped"),
            }),
        );
        self.subscription = Some(id);
        Ok(())
    }

    /// Unsubscribe, cancel pending events and drop the session. Returns the
    /// number of events cancelled.
    pub fn stop(&mut self, transport: &mut dyn TransportClock) -> Result<usize, SequencerError> {
        if let Some(id) = self.subscription.take() {
            transport.cancel(id);
        }
        let session = self
            .session
            .lock()
            .take()
            .ok_or(SequencerError::NotPlaying)?;
        let cancelled = session.stop();
        while self.ui_rx.try_recv().is_ok() {}
        Ok(cancelled)
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("store", &self.store)
            .field("options", &self.options)
            .field("playing", &self.is_playing())
            .finish_non_exhaustive()
    }
}
