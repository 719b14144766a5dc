//! Outbound packet queue feeding the radio-out drain.
//!
//! Mirrors the teacher's `message_queue.rs` shape (a bounded FIFO of
//! timestamped items with an eviction policy) but keyed to the
//! router's actual pressure-relief rule: when full, drop the oldest
//! *non-video* packet first, since video frames are already FEC'd and
//! schedule-critical while telemetry/commands can be regenerated and
//! resent.

use crate::consts::PACKET_QUEUE_CAPACITY;
use crate::packet::{Packet, PacketComponent};
use std::collections::VecDeque;
use std::time::Instant;

/// A packet queued for transmission, with the time it was enqueued
/// (used only for diagnostics; the queue itself is not TTL-based).
#[derive(Debug, Clone)]
struct QueuedPacket {
    packet: Packet,
    queued_at: Instant,
}

/// Bounded FIFO queue of packets bound for the radio-out drain.
///
/// `push` appends at the back; `inject_first` jumps a packet to the
/// front of the line (used for dev-stats/dev-graphs injection and for
/// retransmission replies that must not wait behind bulk traffic).
/// `pop` removes from the front.
#[derive(Debug)]
pub struct PacketQueue {
    capacity: usize,
    items: VecDeque<QueuedPacket>,
    dropped_count: u64,
}

impl PacketQueue {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, items: VecDeque::with_capacity(capacity), dropped_count: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_packets(&self) -> bool {
        !self.items.is_empty()
    }

    /// Total packets dropped for capacity since construction.
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Enqueue at the back. If the queue is full, evicts the oldest
    /// non-video packet to make room; if every queued packet is video,
    /// the new packet is dropped instead (video ordering is preserved
    /// over admitting more video).
    pub fn push(&mut self, packet: Packet) {
        if self.items.len() >= self.capacity {
            if !self.evict_oldest_non_video() {
                self.dropped_count += 1;
                log::warn!("packet queue full of video frames, dropping incoming packet");
                return;
            }
        }
        self.items.push_back(QueuedPacket { packet, queued_at: Instant::now() });
    }

    /// Enqueue at the front, bypassing FIFO order. Used for packets
    /// that must go out ahead of whatever is already queued.
    pub fn inject_first(&mut self, packet: Packet) {
        if self.items.len() >= self.capacity && !self.evict_oldest_non_video() {
            self.dropped_count += 1;
            log::warn!("packet queue full of video frames, dropping injected packet");
            return;
        }
        self.items.push_front(QueuedPacket { packet, queued_at: Instant::now() });
    }

    pub fn pop(&mut self) -> Option<Packet> {
        self.items.pop_front().map(|q| q.packet)
    }

    /// Pop up to `max` packets at once, preserving order.
    pub fn pop_batch(&mut self, max: usize) -> Vec<Packet> {
        let mut out = Vec::with_capacity(max.min(self.items.len()));
        while out.len() < max {
            match self.pop() {
                Some(p) => out.push(p),
                None => break,
            }
        }
        out
    }

    fn evict_oldest_non_video(&mut self) -> bool {
        let idx = self
            .items
            .iter()
            .position(|q| q.packet.header.component() != Some(PacketComponent::Video));
        match idx {
            Some(idx) => {
                self.items.remove(idx);
                self.dropped_count += 1;
                true
            }
            None => false,
        }
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new(PACKET_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{PacketHeader, PacketType};

    fn make_packet(component: PacketComponent) -> Packet {
        let header = PacketHeader::new(component, PacketType::TelemetryAll, 0);
        Packet::new(header, vec![])
    }

    #[test]
    fn fifo_order_preserved() {
        let mut q = PacketQueue::new(4);
        q.push(make_packet(PacketComponent::Telemetry));
        q.push(make_packet(PacketComponent::Commands));
        assert_eq!(q.pop().unwrap().header.component(), Some(PacketComponent::Telemetry));
        assert_eq!(q.pop().unwrap().header.component(), Some(PacketComponent::Commands));
        assert!(q.pop().is_none());
    }

    #[test]
    fn inject_first_jumps_the_line() {
        let mut q = PacketQueue::new(4);
        q.push(make_packet(PacketComponent::Telemetry));
        q.inject_first(make_packet(PacketComponent::LocalControl));
        assert_eq!(q.pop().unwrap().header.component(), Some(PacketComponent::LocalControl));
        assert_eq!(q.pop().unwrap().header.component(), Some(PacketComponent::Telemetry));
    }

    #[test]
    fn overflow_evicts_oldest_non_video_not_video() {
        let mut q = PacketQueue::new(2);
        q.push(make_packet(PacketComponent::Video));
        q.push(make_packet(PacketComponent::Telemetry));
        // Queue full: pushing another video packet must evict telemetry, not video.
        q.push(make_packet(PacketComponent::Video));
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop().unwrap().header.component(), Some(PacketComponent::Video));
        assert_eq!(q.pop().unwrap().header.component(), Some(PacketComponent::Video));
        assert_eq!(q.dropped_count(), 1);
    }

    #[test]
    fn all_video_queue_drops_new_packet() {
        let mut q = PacketQueue::new(1);
        q.push(make_packet(PacketComponent::Video));
        q.push(make_packet(PacketComponent::Video));
        assert_eq!(q.len(), 1);
        assert_eq!(q.dropped_count(), 1);
    }

    #[test]
    fn pop_batch_respects_max_and_availability() {
        let mut q = PacketQueue::new(8);
        for _ in 0..3 {
            q.push(make_packet(PacketComponent::Telemetry));
        }
        let batch = q.pop_batch(10);
        assert_eq!(batch.len(), 3);
        assert!(q.is_empty());
    }
}
