//! Bounded window of the most recent readings
//!
//! The ingestion task pushes one reading per decoded record while the API
//! serves snapshots. [`SharedWindow`] puts the window behind a single lock so a
//! snapshot always reflects a sequence of completed pushes.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default window capacity (last 10 readings)
pub const DEFAULT_WINDOW_CAPACITY: usize = 10;

/// FIFO of the last `capacity` scalar readings, oldest first
#[derive(Debug, Clone)]
pub struct ReadingWindow {
    readings: VecDeque<f64>,
    capacity: usize,
}

impl ReadingWindow {
    /// Create a window; a zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a reading, evicting the oldest when full
    pub fn push(&mut self, value: f64) {
        while self.readings.len() >= self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(value);
    }

    /// Current contents in arrival order
    pub fn snapshot(&self) -> Vec<f64> {
        self.readings.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<f64> {
        self.readings.back().copied()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ReadingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

/// Reading window shared between the ingestion and serving paths
#[derive(Debug, Clone)]
pub struct SharedWindow {
    channel: Arc<str>,
    inner: Arc<RwLock<ReadingWindow>>,
}

impl SharedWindow {
    pub fn new(channel: &str, capacity: usize) -> Self {
        Self {
            channel: Arc::from(channel),
            inner: Arc::new(RwLock::new(ReadingWindow::new(capacity))),
        }
    }

    /// Telemetry field this window tracks
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Push a reading and return the window length afterwards
    pub async fn push(&self, value: f64) -> usize {
        let mut window = self.inner.write().await;
        window.push(value);
        window.len()
    }

    pub async fn snapshot(&self) -> Vec<f64> {
        self.inner.read().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn capacity(&self) -> usize {
        self.inner.read().await.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_below_capacity() {
        let mut window = ReadingWindow::new(4);
        window.push(1.0);
        window.push(2.0);
        assert_eq!(window.snapshot(), vec![1.0, 2.0]);
        assert_eq!(window.latest(), Some(2.0));
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut window = ReadingWindow::new(3);
        for v in 1..=7 {
            window.push(v as f64);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.snapshot(), vec![5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut window = ReadingWindow::default();
        window.push(0.5);
        let _ = window.snapshot();
        let _ = window.snapshot();
        assert_eq!(window.len(), 1);
        assert_eq!(window.capacity(), DEFAULT_WINDOW_CAPACITY);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut window = ReadingWindow::new(0);
        window.push(1.0);
        window.push(2.0);
        assert_eq!(window.snapshot(), vec![2.0]);
    }

    #[tokio::test]
    async fn test_shared_window_snapshots_are_consistent() {
        let window = SharedWindow::new("vibration_rms_mm_s", 10);

        let writer = {
            let window = window.clone();
            tokio::spawn(async move {
                for v in 0..1000 {
                    window.push(v as f64).await;
                }
            })
        };

        // Every snapshot must be a run of consecutive pushes
        for _ in 0..200 {
            let snapshot = window.snapshot().await;
            assert!(snapshot.len() <= 10);
            for pair in snapshot.windows(2) {
                assert_eq!(pair[1] - pair[0], 1.0);
            }
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
        let snapshot = window.snapshot().await;
        assert_eq!(snapshot, (990..1000).map(|v| v as f64).collect::<Vec<_>>());
        assert_eq!(window.channel(), "vibration_rms_mm_s");
    }
}
