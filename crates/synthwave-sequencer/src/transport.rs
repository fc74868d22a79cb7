use std::collections::BTreeMap;
use std::fmt;

use crate::time::{Seconds, Subdivision, TempoHandle};

/// Callback invoked once per subdivision with the absolute time of the step.
pub type TickCallback = Box<dyn FnMut(Seconds) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// The audio transport as seen by the sequencer.
pub trait TransportClock {
    fn subscribe(&mut self, subdivision: Subdivision, callback: TickCallback) -> SubscriptionId;
    fn cancel(&mut self, id: SubscriptionId);
    fn current_tempo_bpm(&self) -> f32;
    /// Shared tempo cell the transport reads on every tick.
    fn tempo_handle(&self) -> TempoHandle;
    /// How far ahead of the playhead tick times are issued.
    fn lookahead(&self) -> Seconds;
}

struct Subscription {
    subdivision: Subdivision,
    callback: TickCallback,
    next_time: Seconds,
}

/// Transport driven by hand, for offline rendering and tests.
///
/// Each subscription starts one look-ahead interval after the transport's
/// current position and advances by one step duration, at the tempo in force,
/// per tick.
pub struct ManualTransport {
    tempo: TempoHandle,
    lookahead: Seconds,
    position: Seconds,
    next_id: u64,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
}

impl ManualTransport {
    pub fn new(bpm: f32, lookahead: Seconds) -> Self {
        Self {
            tempo: TempoHandle::new(bpm),
            lookahead: lookahead.max(0.0),
            position: 0.0,
            next_id: 1,
            subscriptions: BTreeMap::new(),
        }
    }

    pub fn set_bpm(&self, bpm: f32) {
        self.tempo.set_bpm(bpm);
    }

    /// Playhead, in seconds since the transport was created.
    pub fn position(&self) -> Seconds {
        self.position
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Fire every live subscription `ticks` times.
    pub fn advance(&mut self, ticks: usize) {
        let bpm = self.tempo.clone();
        for subscription in self.subscriptions.values_mut() {
            for _ in 0..ticks {
                let step_time = subscription.next_time;
                (subscription.callback)(step_time);
                subscription.next_time = step_time + subscription.subdivision.step_duration(bpm.bpm());
            }
            self.position = self.position.max(subscription.next_time - self.lookahead);
        }
    }
}

impl TransportClock for ManualTransport {
    fn subscribe(&mut self, subdivision: Subdivision, callback: TickCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.insert(
            id,
            Subscription {
                subdivision,
                callback,
                next_time: self.position + self.lookahead,
            },
        );
        id
    }

    fn cancel(&mut self, id: SubscriptionId) {
        self.subscriptions.remove(&id);
    }

    fn current_tempo_bpm(&self) -> f32 {
        self.tempo.bpm()
    }

    fn tempo_handle(&self) -> TempoHandle {
        self.tempo.clone()
    }

    fn lookahead(&self) -> Seconds {
        self.lookahead
    }
}

impl fmt::Debug for ManualTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTransport")
            .field("bpm", &self.tempo.bpm())
            .field("lookahead", &self.lookahead)
            .field("position", &self.position)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;

    fn recorder(transport: &mut ManualTransport, subdivision: Subdivision) -> (SubscriptionId, Arc<Mutex<Vec<Seconds>>>) {
        let times = Arc::new(Mutex::new(Vec::new()));
        let sink = times.clone();
        let id = transport.subscribe(subdivision, Box::new(move |t| sink.lock().push(t)));
        (id, times)
    }

    #[test]
    fn ticks_start_after_lookahead_and_follow_tempo() {
        let mut transport = ManualTransport::new(120.0, 0.1);
        let (_, times) = recorder(&mut transport, Subdivision::Sixteenth);
        transport.advance(2);
        transport.set_bpm(60.0);
        transport.advance(2);
        let times = times.lock().clone();
        let expected = [0.1, 0.225, 0.35, 0.6];
        for (actual, expected) in times.iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
        }
        assert!((transport.position() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn cancelled_subscriptions_stop_ticking() {
        let mut transport = ManualTransport::new(120.0, 0.0);
        let (id, times) = recorder(&mut transport, Subdivision::Quarter);
        transport.advance(1);
        transport.cancel(id);
        transport.advance(3);
        assert_eq!(times.lock().len(), 1);
        assert_eq!(transport.subscription_count(), 0);

        let (_, later) = recorder(&mut transport, Subdivision::Quarter);
        transport.advance(1);
        assert_eq!(later.lock().as_slice(), &[0.5]);
    }
}
