use alloc::vec::Vec;

use rowwindow::{KeyCacheKey, KeyMap, ScrollDirection};

/// When a subscription hears about scroll events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollDelivery {
    /// On every event.
    #[default]
    Sync,
    /// Once events have been quiet for `delay_ms`.
    Debounce { delay_ms: u64 },
    /// At most once per animation frame, with the latest offset.
    AnimationFrame,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// A scroll offset handed to one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub subscription: SubscriptionId,
    pub offset: u64,
    pub direction: ScrollDirection,
}

#[derive(Clone, Debug)]
struct Subscription {
    id: SubscriptionId,
    delivery: ScrollDelivery,
    min_delta: u64,
    last_delivered: Option<u64>,
    pending: Option<u64>,
    due_ms: u64,
}

impl Subscription {
    fn deliver(&mut self, offset: u64) -> Option<Delivery> {
        if let Some(last) = self.last_delivered {
            if last.abs_diff(offset) < self.min_delta.max(1) {
                return None;
            }
        }
        let direction = ScrollDirection::between(self.last_delivered.unwrap_or(0), offset);
        self.last_delivered = Some(offset);
        Some(Delivery {
            subscription: self.id,
            offset,
            direction,
        })
    }
}

/// Fans the scroll events of one surface out to several subscriptions.
///
/// The host forwards raw events to [`Self::on_scroll`] and drives deferred deliveries through
/// [`Self::tick`] (debounced) and [`Self::on_animation_frame`] (frame-coalesced). A delivery is
/// suppressed while the offset moved less than the subscription's `min_delta` since the last
/// one it received; an unchanged offset is never delivered twice.
#[derive(Clone, Debug, Default)]
pub struct ScrollDispatcher {
    subscriptions: Vec<Subscription>,
}

impl ScrollDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    fn add(&mut self, id: SubscriptionId, delivery: ScrollDelivery, min_delta: u64) {
        self.subscriptions.push(Subscription {
            id,
            delivery,
            min_delta,
            last_delivered: None,
            pending: None,
            due_ms: 0,
        });
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Records a raw scroll event and returns the synchronous deliveries.
    pub fn on_scroll(&mut self, offset: u64, now_ms: u64) -> Vec<Delivery> {
        let mut out = Vec::new();
        for sub in &mut self.subscriptions {
            match sub.delivery {
                ScrollDelivery::Sync => out.extend(sub.deliver(offset)),
                ScrollDelivery::Debounce { delay_ms } => {
                    sub.pending = Some(offset);
                    sub.due_ms = now_ms.saturating_add(delay_ms);
                }
                ScrollDelivery::AnimationFrame => sub.pending = Some(offset),
            }
        }
        out
    }

    /// Flushes debounced subscriptions that have been quiet long enough.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Delivery> {
        let mut out = Vec::new();
        for sub in &mut self.subscriptions {
            if !matches!(sub.delivery, ScrollDelivery::Debounce { .. }) || sub.due_ms > now_ms {
                continue;
            }
            if let Some(offset) = sub.pending.take() {
                out.extend(sub.deliver(offset));
            }
        }
        out
    }

    pub fn on_animation_frame(&mut self) -> Vec<Delivery> {
        let mut out = Vec::new();
        for sub in &mut self.subscriptions {
            if sub.delivery != ScrollDelivery::AnimationFrame {
                continue;
            }
            if let Some(offset) = sub.pending.take() {
                out.extend(sub.deliver(offset));
            }
        }
        out
    }

    /// Earliest pending debounce deadline.
    pub fn next_due(&self) -> Option<u64> {
        self.subscriptions
            .iter()
            .filter(|s| {
                s.pending.is_some() && matches!(s.delivery, ScrollDelivery::Debounce { .. })
            })
            .map(|s| s.due_ms)
            .min()
    }
}

/// Owns one [`ScrollDispatcher`] per surface id.
///
/// A dispatcher is created by the first subscription for its surface and dropped with the last.
#[derive(Clone, Debug)]
pub struct ScrollHub<K> {
    dispatchers: KeyMap<K, ScrollDispatcher>,
    next_id: u64,
}

impl<K: KeyCacheKey + Clone> Default for ScrollHub<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KeyCacheKey + Clone> ScrollHub<K> {
    pub fn new() -> Self {
        Self {
            dispatchers: KeyMap::new(),
            next_id: 0,
        }
    }

    /// Number of live dispatchers.
    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }

    pub fn dispatcher(&self, surface: &K) -> Option<&ScrollDispatcher> {
        self.dispatchers.get(surface)
    }

    pub fn subscribe(
        &mut self,
        surface: K,
        delivery: ScrollDelivery,
        min_delta: u64,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let dispatcher = self.dispatchers.entry(surface).or_insert_with(|| {
            vdebug!("scroll dispatcher created");
            ScrollDispatcher::new()
        });
        dispatcher.add(id, delivery, min_delta);
        id
    }

    /// Returns `false` for an unknown id.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut emptied = None;
        let mut found = false;
        for (surface, dispatcher) in self.dispatchers.iter_mut() {
            if dispatcher.remove(id) {
                found = true;
                if dispatcher.is_empty() {
                    emptied = Some(surface.clone());
                }
                break;
            }
        }
        if let Some(surface) = emptied {
            self.dispatchers.remove(&surface);
            vdebug!("scroll dispatcher dropped");
        }
        found
    }

    pub fn on_scroll(&mut self, surface: &K, offset: u64, now_ms: u64) -> Vec<Delivery> {
        self.dispatchers
            .get_mut(surface)
            .map(|d| d.on_scroll(offset, now_ms))
            .unwrap_or_default()
    }

    pub fn tick(&mut self, now_ms: u64) -> Vec<Delivery> {
        let mut out = Vec::new();
        for dispatcher in self.dispatchers.values_mut() {
            out.extend(dispatcher.tick(now_ms));
        }
        out
    }

    pub fn on_animation_frame(&mut self, surface: &K) -> Vec<Delivery> {
        self.dispatchers
            .get_mut(surface)
            .map(ScrollDispatcher::on_animation_frame)
            .unwrap_or_default()
    }
}
