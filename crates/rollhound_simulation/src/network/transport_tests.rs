//! Tests for the in-process broadcast bus.

use super::*;

fn jump(id: u64) -> Broadcast {
    Broadcast {
        target: NetworkId(id),
        effect: ReplicatedEffect::Jump { impulse: Vec3::Y },
    }
}

#[test]
fn test_bus_delivers_to_every_peer_including_sender() {
    let bus = LocalBus::new();
    let mut authority = bus.join();
    let mut observer_a = bus.join();
    let mut observer_b = bus.join();

    authority.send(jump(7));

    assert_eq!(authority.poll(), vec![jump(7)]);
    assert_eq!(observer_a.poll(), vec![jump(7)]);
    assert_eq!(observer_b.poll(), vec![jump(7)]);
}

#[test]
fn test_poll_drains_inbox() {
    let bus = LocalBus::new();
    let mut peer = bus.join();

    peer.send(jump(1));
    peer.send(jump(2));

    assert_eq!(peer.poll().len(), 2);
    assert!(peer.poll().is_empty());
}

#[test]
fn test_late_joiner_misses_earlier_broadcasts() {
    // Fire-and-forget: нет истории для тех, кто подключился позже
    let bus = LocalBus::new();
    let mut early = bus.join();
    early.send(jump(3));

    let mut late = bus.join();
    assert!(late.poll().is_empty());
    assert_eq!(early.poll().len(), 1);
}

#[test]
fn test_dropped_peer_stops_buffering() {
    let bus = LocalBus::new();
    let mut live = bus.join();
    {
        let _gone = bus.join();
    }
    assert_eq!(bus.peer_count(), 1);

    for i in 0..1000 {
        live.send(jump(i));
        live.poll();
    }

    // Ни один слот не копит сообщения
    let inboxes = bus.lock();
    assert!(inboxes[1].is_none());
    assert!(inboxes.iter().flatten().all(VecDeque::is_empty));
}

#[test]
fn test_retired_slot_reused_by_next_joiner() {
    let bus = LocalBus::new();
    let mut sender = bus.join();
    drop(bus.join());

    let mut rejoined = bus.join();
    assert_eq!(bus.peer_count(), 2);
    assert_eq!(bus.lock().len(), 2);

    sender.send(jump(5));
    assert_eq!(rejoined.poll(), vec![jump(5)]);
}
