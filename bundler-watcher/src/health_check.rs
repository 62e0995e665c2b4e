// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::{Duration, Instant};

/// `watcher.healthCheck` configuration (spec §6). Named but not designed by
/// spec §5/§7 (`WatcherError`: "health-check timer may trigger restart");
/// this is the periodic probe that decides when a restart is warranted.
#[derive(Clone, Copy, Debug)]
pub struct HealthCheckConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        HealthCheckConfig {
            enabled: false,
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
        }
    }
}

/// What the caller should do after a `tick`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HealthCheckAction {
    Idle,
    /// Touch the sentinel path and expect to observe our own event within
    /// `timeout`.
    SendProbe,
    /// `interval` elapsed since the probe with no corresponding event seen;
    /// the backend is presumed unhealthy.
    Restart,
}

/// A `stat`-roundtrip health check on a sentinel path: every `interval`,
/// touch the sentinel; if no watcher event for it arrives within `timeout`,
/// report `Restart`.
pub struct HealthCheck {
    config: HealthCheckConfig,
    last_probe_sent: Option<Instant>,
    last_event_seen: Instant,
}

impl HealthCheck {
    pub fn new(config: HealthCheckConfig, now: Instant) -> Self {
        HealthCheck {
            config,
            last_probe_sent: None,
            last_event_seen: now,
        }
    }

    /// Call whenever any watcher event is observed (not just the sentinel's);
    /// any liveness signal resets the interval clock.
    pub fn record_event(&mut self, now: Instant) {
        self.last_event_seen = now;
        self.last_probe_sent = None;
    }

    pub fn tick(&mut self, now: Instant) -> HealthCheckAction {
        if !self.config.enabled {
            return HealthCheckAction::Idle;
        }
        match self.last_probe_sent {
            None => {
                if now.saturating_duration_since(self.last_event_seen) >= self.config.interval {
                    self.last_probe_sent = Some(now);
                    HealthCheckAction::SendProbe
                } else {
                    HealthCheckAction::Idle
                }
            }
            Some(sent_at) => {
                if now.saturating_duration_since(sent_at) >= self.config.timeout {
                    HealthCheckAction::Restart
                } else {
                    HealthCheckAction::Idle
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_check_is_always_idle() {
        let now = Instant::now();
        let mut check = HealthCheck::new(HealthCheckConfig::default(), now);
        assert_eq!(check.tick(now + Duration::from_secs(3600)), HealthCheckAction::Idle);
    }

    #[test]
    fn probes_after_interval_then_restarts_after_timeout() {
        let now = Instant::now();
        let config = HealthCheckConfig {
            enabled: true,
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(2),
        };
        let mut check = HealthCheck::new(config, now);

        assert_eq!(check.tick(now + Duration::from_secs(5)), HealthCheckAction::Idle);
        assert_eq!(check.tick(now + Duration::from_secs(10)), HealthCheckAction::SendProbe);
        assert_eq!(check.tick(now + Duration::from_secs(11)), HealthCheckAction::Idle);
        assert_eq!(check.tick(now + Duration::from_secs(12)), HealthCheckAction::Restart);
    }

    #[test]
    fn an_observed_event_resets_the_interval_clock() {
        let now = Instant::now();
        let config = HealthCheckConfig {
            enabled: true,
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(2),
        };
        let mut check = HealthCheck::new(config, now);

        check.tick(now + Duration::from_secs(9));
        check.record_event(now + Duration::from_secs(9));
        assert_eq!(check.tick(now + Duration::from_secs(15)), HealthCheckAction::Idle);
        assert_eq!(check.tick(now + Duration::from_secs(19)), HealthCheckAction::SendProbe);
    }
}
