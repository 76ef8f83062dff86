use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Play session kind, encoded as the SSRC's leading digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Live,
    Playback,
    Download,
}

impl Kind {
    pub fn digit(self) -> u8 {
        match self {
            Kind::Live => 0,
            Kind::Playback => 1,
            Kind::Download => 2,
        }
    }

    pub fn from_digit(digit: i64) -> Self {
        match digit {
            1 => Kind::Playback,
            2 => Kind::Download,
            _ => Kind::Live,
        }
    }
}

/// A 5-digit, stable hash of the region id, making up the middle segment
/// of the 10-digit `<Kind-digit><Region-hash-5><Counter-4>` SSRC.
fn region_hash(region_id: &str) -> u32 {
    let mut hash: u32 = 0;
    for b in region_id.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(b as u32);
    }
    hash % 100_000
}

/// Format a kind digit, region hash, and counter into the canonical
/// 10-digit decimal SSRC string, zero-padded (folds in
/// `original_source/sip/play.go`'s `ssrc2stream` zero-padding so it's never
/// duplicated at call sites).
pub fn format_ssrc(kind: Kind, region_id: &str, counter: u32) -> String {
    format!("{}{:05}{:04}", kind.digit(), region_hash(region_id), counter % 10_000)
}

/// Allocates SSRCs per kind with a monotonic counter that skips any value
/// colliding with a currently-live Stream, even across a counter wraparound.
pub struct SsrcAllocator {
    region_id: String,
    counters: [AtomicU32; 3],
    /// SSRCs currently in use, reserved across a grace period after release
    /// to avoid a late frame binding to a reused value.
    reserved: Arc<Mutex<HashSet<String>>>,
}

impl SsrcAllocator {
    pub fn new(region_id: impl Into<String>) -> Self {
        Self {
            region_id: region_id.into(),
            counters: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
            reserved: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn allocate(&self, kind: Kind) -> String {
        let counter_idx = kind.digit() as usize;
        loop {
            let counter = self.counters[counter_idx].fetch_add(1, Ordering::SeqCst);
            let ssrc = format_ssrc(kind, &self.region_id, counter);
            let mut reserved = self.reserved.lock();
            if !reserved.contains(&ssrc) {
                reserved.insert(ssrc.clone());
                return ssrc;
            }
        }
    }

    /// Release an SSRC back to the pool. Callers schedule this after the
    /// reuse-avoidance grace period, not immediately on Stream teardown.
    pub fn release(&self, ssrc: &str) {
        self.reserved.lock().remove(ssrc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_ssrcs_are_ten_digits_and_carry_the_kind_prefix() {
        let allocator = SsrcAllocator::new("3402000000");
        let live = allocator.allocate(Kind::Live);
        let playback = allocator.allocate(Kind::Playback);
        let download = allocator.allocate(Kind::Download);
        assert_eq!(live.len(), 10);
        assert!(live.starts_with('0'));
        assert!(playback.starts_with('1'));
        assert!(download.starts_with('2'));
    }

    #[test]
    fn concurrent_allocations_never_collide() {
        let allocator = Arc::new(SsrcAllocator::new("3402000000"));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let allocator = allocator.clone();
            handles.push(std::thread::spawn(move || {
                (0..500)
                    .map(|_| allocator.allocate(Kind::Live))
                    .collect::<Vec<_>>()
            }));
        }
        let mut all = HashSet::new();
        for h in handles {
            for ssrc in h.join().unwrap() {
                assert!(all.insert(ssrc), "duplicate SSRC allocated");
            }
        }
    }
}
