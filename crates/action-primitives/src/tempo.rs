//! Settle pauses between UI steps.

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Named pauses used by the driver and the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pause {
    /// After opening a unit's menu.
    MenuSettle,
    /// After choosing the delete item, before looking for confirmation.
    ConfirmSettle,
    /// After closing menus and dialogs.
    DismissSettle,
    PostDelete,
    PostSkip,
    /// After scrolling the viewport.
    ScrollSettle,
    /// Bounded random pause between iterations.
    Jitter,
    /// After an iteration failed as a whole.
    ErrorBackoff,
}

/// Pause durations in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tempo {
    pub menu_settle_ms: u64,
    pub confirm_settle_ms: u64,
    pub dismiss_settle_ms: u64,
    pub post_delete_ms: u64,
    pub post_skip_ms: u64,
    pub scroll_settle_ms: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    pub error_backoff_ms: u64,
    /// Fixes the jitter sequence when set.
    pub seed: Option<u64>,
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            menu_settle_ms: 600,
            confirm_settle_ms: 600,
            dismiss_settle_ms: 200,
            post_delete_ms: 1_000,
            post_skip_ms: 600,
            scroll_settle_ms: 1_200,
            jitter_min_ms: 800,
            jitter_max_ms: 1_400,
            error_backoff_ms: 2_000,
            seed: None,
        }
    }
}

impl Tempo {
    /// Every pause is zero. Used by tests.
    pub fn instant() -> Self {
        Self {
            menu_settle_ms: 0,
            confirm_settle_ms: 0,
            dismiss_settle_ms: 0,
            post_delete_ms: 0,
            post_skip_ms: 0,
            scroll_settle_ms: 0,
            jitter_min_ms: 0,
            jitter_max_ms: 0,
            error_backoff_ms: 0,
            seed: Some(0),
        }
    }

    fn fixed_ms(&self, pause: Pause) -> Option<u64> {
        match pause {
            Pause::MenuSettle => Some(self.menu_settle_ms),
            Pause::ConfirmSettle => Some(self.confirm_settle_ms),
            Pause::DismissSettle => Some(self.dismiss_settle_ms),
            Pause::PostDelete => Some(self.post_delete_ms),
            Pause::PostSkip => Some(self.post_skip_ms),
            Pause::ScrollSettle => Some(self.scroll_settle_ms),
            Pause::ErrorBackoff => Some(self.error_backoff_ms),
            Pause::Jitter => None,
        }
    }
}

/// Turns a [`Tempo`] into actual sleeps.
pub struct Pacer {
    tempo: Tempo,
    rng: Mutex<StdRng>,
}

impl Pacer {
    pub fn new(tempo: Tempo) -> Self {
        let rng = match tempo.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            tempo,
            rng: Mutex::new(rng),
        }
    }

    pub fn duration(&self, pause: Pause) -> Duration {
        if let Some(ms) = self.tempo.fixed_ms(pause) {
            return Duration::from_millis(ms);
        }
        let low = self.tempo.jitter_min_ms.min(self.tempo.jitter_max_ms);
        let high = self.tempo.jitter_min_ms.max(self.tempo.jitter_max_ms);
        if low == high {
            return Duration::from_millis(low);
        }
        Duration::from_millis(self.rng.lock().gen_range(low..=high))
    }

    pub async fn pause(&self, pause: Pause) {
        let duration = self.duration(pause);
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    /// Sleeps unless `cancel` fires first. Returns `false` when cancelled.
    pub async fn pause_or_cancel(&self, pause: Pause, cancel: &CancellationToken) -> bool {
        let duration = self.duration(pause);
        if duration.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_bounds() {
        let pacer = Pacer::new(Tempo {
            seed: Some(7),
            ..Tempo::default()
        });
        for _ in 0..200 {
            let ms = pacer.duration(Pause::Jitter).as_millis() as u64;
            assert!((800..=1_400).contains(&ms), "jitter {ms} out of range");
        }
        assert_eq!(pacer.duration(Pause::ScrollSettle), Duration::from_millis(1_200));
        assert_eq!(pacer.duration(Pause::ErrorBackoff), Duration::from_millis(2_000));
    }

    #[test]
    fn inverted_jitter_bounds_are_tolerated() {
        let pacer = Pacer::new(Tempo {
            jitter_min_ms: 50,
            jitter_max_ms: 10,
            seed: Some(1),
            ..Tempo::instant()
        });
        let ms = pacer.duration(Pause::Jitter).as_millis() as u64;
        assert!((10..=50).contains(&ms));
    }

    #[tokio::test]
    async fn cancelled_pause_returns_early() {
        let pacer = Pacer::new(Tempo {
            error_backoff_ms: 60_000,
            ..Tempo::instant()
        });
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!pacer.pause_or_cancel(Pause::ErrorBackoff, &cancel).await);
        assert!(pacer.pause_or_cancel(Pause::PostSkip, &CancellationToken::new()).await);
    }
}
