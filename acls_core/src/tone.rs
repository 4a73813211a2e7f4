//! Sequential tone scheduling for alert beeps.
//!
//! The alert engine only decides *that* a beep is due. The audio side pulls
//! tones off this queue one at a time and waits `gap_after` before the next.

use crate::config::SoundConfig;
use crate::Beep;
use std::collections::VecDeque;
use std::time::Duration;

/// One discrete tone request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration: Duration,
    pub gap_after: Duration,
}

/// FIFO of pending tones
#[derive(Debug, Default)]
pub struct ToneQueue {
    pending: VecDeque<Tone>,
}

impl ToneQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `beep.count()` tones shaped by the sound config
    pub fn enqueue(&mut self, beep: Beep, sound: &SoundConfig) {
        let tone = Tone {
            frequency_hz: sound.frequency_hz,
            duration: Duration::from_millis(sound.tone_ms),
            gap_after: Duration::from_millis(sound.gap_ms),
        };
        for _ in 0..beep.count() {
            self.pending.push_back(tone);
        }
        tracing::debug!("Queued {:?} ({} pending tones)", beep, self.pending.len());
    }

    pub fn pop(&mut self) -> Option<Tone> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
