use parking_lot::Mutex;

/// Single-value "latest state" holder.
///
/// Publishing overwrites; intermediate values are discarded, never queued.
#[derive(Debug)]
pub struct LatestSlot<T> {
    inner: Mutex<Option<(u64, T)>>,
}

impl<T: Clone> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Replace the held value, returning its sequence number (starting at 1).
    pub fn publish(&self, value: T) -> u64 {
        let mut guard = self.inner.lock();
        let seq = guard.as_ref().map_or(0, |(seq, _)| *seq) + 1;
        *guard = Some((seq, value));
        seq
    }

    pub fn get(&self) -> Option<T> {
        self.inner.lock().as_ref().map(|(_, v)| v.clone())
    }

    /// Number of publishes since creation or the last `clear`.
    pub fn seq(&self) -> u64 {
        self.inner.lock().as_ref().map_or(0, |(seq, _)| *seq)
    }

    pub fn clear(&self) {
        *self.inner.lock() = None;
    }
}

impl<T: Clone> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
