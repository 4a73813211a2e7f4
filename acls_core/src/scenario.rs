//! Scripted replays of a resuscitation timeline.
//!
//! A scenario is a plain-text file with one action per line:
//!
//! ```text
//! # offset  action
//! 00:00     start
//! 00:05     epi
//! 02:10     shock
//! 06:40     end
//! ```
//!
//! Offsets are `MM:SS` from the replay origin and must not go backwards.
//! Replaying drives a [`Monitor`] with a virtual clock, so alert timing can
//! be checked without waiting in real time.

use crate::monitor::{Monitor, MonitorObserver};
use crate::{DoseKind, Error, Result};
use chrono::{DateTime, Duration, Local};

/// A scripted user action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Start,
    Dose(DoseKind),
    Shock,
    Reset,
    Clear,
    /// Explicit sampler tick
    Tick,
    /// Run the sampler up to this offset and stop
    End,
}

impl Action {
    fn parse(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "start" => Some(Action::Start),
            "epi" | "epinephrine" => Some(Action::Dose(DoseKind::Epinephrine)),
            "amio" | "amiodarone" => Some(Action::Dose(DoseKind::Amiodarone)),
            "shock" => Some(Action::Shock),
            "reset" => Some(Action::Reset),
            "clear" => Some(Action::Clear),
            "tick" => Some(Action::Tick),
            "end" => Some(Action::End),
            _ => None,
        }
    }
}

/// One line of a scenario
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub offset_secs: u32,
    pub action: Action,
}

/// How the virtual sampler runs during a replay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayClock {
    /// Tick every N seconds on a grid anchored at the origin
    Every(u32),
    /// Tick only on explicit `tick` lines
    Manual,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scenario {
    steps: Vec<Step>,
}

impl Scenario {
    pub fn parse(input: &str) -> Result<Self> {
        let mut steps = Vec::new();
        let mut last_offset = 0;

        for (line_num, raw) in input.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let mut words = line.split_whitespace();
            let (Some(offset), Some(action), None) = (words.next(), words.next(), words.next())
            else {
                return Err(Error::Scenario(format!(
                    "line {}: expected `MM:SS action`, got {:?}",
                    line_num + 1,
                    line
                )));
            };

            let offset_secs = parse_offset(offset).ok_or_else(|| {
                Error::Scenario(format!("line {}: bad offset {:?}", line_num + 1, offset))
            })?;
            let action = Action::parse(action).ok_or_else(|| {
                Error::Scenario(format!("line {}: unknown action {:?}", line_num + 1, action))
            })?;

            if offset_secs < last_offset {
                return Err(Error::Scenario(format!(
                    "line {}: offset {} goes backwards",
                    line_num + 1,
                    offset
                )));
            }
            last_offset = offset_secs;
            steps.push(Step {
                offset_secs,
                action,
            });
        }

        tracing::debug!("Parsed scenario with {} steps", steps.len());
        Ok(Self { steps })
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Drive `monitor` through every step
    ///
    /// With [`ReplayClock::Every`], grid ticks that fall on an action's offset
    /// run before the action, like a sampler that fired first.
    pub fn replay<O: MonitorObserver>(
        &self,
        monitor: &mut Monitor<O>,
        origin: DateTime<Local>,
        clock: ReplayClock,
    ) {
        let at = |secs: u32| origin + Duration::seconds(i64::from(secs));
        // `None` once the grid runs past the largest representable offset
        let mut next_tick = match clock {
            ReplayClock::Every(interval) => Some(interval.max(1)),
            ReplayClock::Manual => None,
        };

        for step in &self.steps {
            if let ReplayClock::Every(interval) = clock {
                let interval = interval.max(1);
                while let Some(tick) = next_tick.filter(|t| *t <= step.offset_secs) {
                    monitor.tick(at(tick));
                    next_tick = tick.checked_add(interval);
                }
            }

            let now = at(step.offset_secs);
            match step.action {
                Action::Start => {
                    monitor.start_session(now);
                }
                Action::Dose(kind) => monitor.give_dose(kind, now),
                Action::Shock => {
                    monitor.give_shock(now);
                }
                Action::Reset => monitor.reset_session(now),
                Action::Clear => {
                    monitor.clear_log();
                }
                Action::Tick => {
                    monitor.tick(now);
                }
                Action::End => break,
            }
        }
    }
}

/// `MM:SS` with any number of minute digits
fn parse_offset(s: &str) -> Option<u32> {
    let (minutes, seconds) = s.split_once(':')?;
    let minutes: u32 = minutes.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    minutes.checked_mul(60)?.checked_add(seconds)
}
