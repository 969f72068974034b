//! Local bookkeeping of requested channels.
//!
//! Subscriptions are fire-and-forget on the wire. The tracker only records
//! what was requested and flips a channel to `Active` once a snapshot for it
//! is seen, so the read loop can log confirmations.

use crate::MarketEvent;
use lighter_core::Channel;

/// Status of a requested channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Request sent, no snapshot received yet.
    Pending,
    /// Snapshot received.
    Active,
}

impl SubscriptionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

/// Requested channels in request order.
#[derive(Debug, Default, Clone)]
pub struct SubscriptionTracker {
    entries: Vec<(Channel, SubscriptionStatus)>,
}

impl SubscriptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request. Returns false if the channel was already tracked.
    pub fn request(&mut self, channel: Channel) -> bool {
        if self.status(channel).is_some() {
            return false;
        }
        self.entries.push((channel, SubscriptionStatus::Pending));
        true
    }

    /// Forget a channel. Returns false if it was not tracked.
    pub fn remove(&mut self, channel: Channel) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(tracked, _)| *tracked != channel);
        self.entries.len() != before
    }

    /// Mark pending channels covered by a snapshot as active.
    ///
    /// When the echoed channel names a market only that channel is
    /// confirmed, otherwise every pending channel of the event's topic is.
    /// Returns the channels that changed state.
    pub fn confirm(&mut self, event: &MarketEvent) -> Vec<Channel> {
        let topic = event.topic();
        let echoed = event
            .channel()
            .and_then(|name| name.parse::<Channel>().ok())
            .filter(|channel| channel.topic == topic);

        let mut confirmed = Vec::new();
        for (channel, status) in self.entries.iter_mut() {
            let matches = match echoed {
                Some(echoed) => *channel == echoed,
                None => channel.topic == topic,
            };
            if matches && *status == SubscriptionStatus::Pending {
                *status = SubscriptionStatus::Active;
                confirmed.push(*channel);
            }
        }
        confirmed
    }

    pub fn status(&self, channel: Channel) -> Option<SubscriptionStatus> {
        self.entries
            .iter()
            .find(|(tracked, _)| *tracked == channel)
            .map(|(_, status)| *status)
    }

    pub fn channels(&self) -> impl Iterator<Item = (Channel, SubscriptionStatus)> + '_ {
        self.entries.iter().copied()
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, status)| !status.is_active())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
