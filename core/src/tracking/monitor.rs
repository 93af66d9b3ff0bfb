use crate::config::{render_caption, AlertTier, MonitorConfig};
use crate::prelude::{DisplayId, Point, ZoneKind};
use crate::telemetry::LogManager;
use crate::tracking::identity::{IdentityRegistry, SubmergedCandidate};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Everything the monitor remembers about one swimmer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub display_id: DisplayId,
    pub last_seen: f64,
    pub last_position: Point,
    pub last_zone: ZoneKind,
    pub alert_level: u8,
    pub last_repeat_alert_at: Option<f64>,
    pub acknowledged: bool,
    pub counted_missing: bool,
    pub entered_from_safe: bool,
    pub exited_to_safe: bool,
    pub submerged: bool,
}

impl Identity {
    pub fn new(
        display_id: DisplayId,
        position: Point,
        zone: ZoneKind,
        now: f64,
        entered_from_safe: bool,
    ) -> Self {
        Self {
            display_id,
            last_seen: now,
            last_position: position,
            last_zone: zone,
            alert_level: 0,
            last_repeat_alert_at: None,
            acknowledged: false,
            counted_missing: false,
            entered_from_safe,
            exited_to_safe: zone == ZoneKind::Safe,
            submerged: false,
        }
    }

    /// Missing timers only run for swimmers last seen in the water.
    fn watched_in_pool(&self) -> bool {
        self.last_zone == ZoneKind::Pool && !self.exited_to_safe
    }

    pub fn has_active_alert(&self) -> bool {
        self.alert_level > 0 || self.submerged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PresenceState {
    Visible,
    Missing { level: u8 },
    Acknowledged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Tier(u8),
    Repeat,
}

/// Request for the dispatcher, produced by a monitor evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRequest {
    pub display_id: DisplayId,
    pub kind: AlertKind,
    pub elapsed: f64,
    pub caption: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescueTarget {
    One(DisplayId),
    All,
}

/// Per-identity missing-swimmer state machine with tiered escalation.
#[derive(Debug)]
pub struct MissingPersonMonitor {
    identities: BTreeMap<DisplayId, Identity>,
    missing_in_pool: usize,
    tiers: Vec<AlertTier>,
    submerge_grace: f64,
    missing_threshold: f64,
    repeat_interval: f64,
    repeat_message: String,
    logger: LogManager,
}

impl MissingPersonMonitor {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            identities: BTreeMap::new(),
            missing_in_pool: 0,
            tiers: config.tiers.clone(),
            submerge_grace: config.submerge_grace_sec,
            missing_threshold: config.missing_alert_sec,
            repeat_interval: config.repeat_alert_interval_sec,
            repeat_message: config.repeat_message.clone(),
            logger: LogManager::new("monitor"),
        }
    }

    /// Marks the identity as seen this frame, creating it on first sighting.
    pub fn observe(
        &mut self,
        id: DisplayId,
        position: Point,
        zone: ZoneKind,
        now: f64,
        entered_from_safe: bool,
    ) {
        let identity = self
            .identities
            .entry(id)
            .or_insert_with(|| Identity::new(id, position, zone, now, entered_from_safe));

        if identity.alert_level > 0 {
            self.logger.record(&format!(
                "{} visible again after {:.1}s (was level {})",
                id,
                now - identity.last_seen,
                identity.alert_level
            ));
        }
        if identity.counted_missing {
            identity.counted_missing = false;
            self.missing_in_pool = self.missing_in_pool.saturating_sub(1);
        }
        identity.alert_level = 0;
        identity.last_repeat_alert_at = None;
        identity.acknowledged = false;
        identity.submerged = false;
        identity.last_seen = now;
        identity.last_position = position;
        identity.last_zone = zone;
        match zone {
            ZoneKind::Safe => {
                if !identity.exited_to_safe {
                    self.logger.detail(&format!("{} reached the safe zone", id));
                }
                identity.exited_to_safe = true;
            }
            ZoneKind::Pool => identity.exited_to_safe = false,
            ZoneKind::Outside => {}
        }
    }

    /// Re-installs an identity recovered by re-identification.
    ///
    /// The live record decides whether the missing counter is released; the
    /// snapshot may predate the moment the swimmer was counted.
    pub fn restore(&mut self, saved: Identity, position: Point, now: f64) {
        let id = saved.display_id;
        let counted = self
            .identities
            .get(&id)
            .map_or(saved.counted_missing, |live| live.counted_missing);
        if counted {
            self.missing_in_pool = self.missing_in_pool.saturating_sub(1);
        }
        let restored = Identity {
            last_seen: now,
            last_position: position,
            last_zone: ZoneKind::Pool,
            alert_level: 0,
            last_repeat_alert_at: None,
            acknowledged: false,
            counted_missing: false,
            exited_to_safe: false,
            submerged: false,
            ..saved
        };
        self.identities.insert(id, restored);
    }

    /// Advances every unseen pool identity and returns the alerts due now.
    pub fn evaluate(
        &mut self,
        seen: &HashSet<DisplayId>,
        now: f64,
        registry: &mut IdentityRegistry,
    ) -> Vec<AlertRequest> {
        let Self {
            identities,
            missing_in_pool,
            tiers,
            submerge_grace,
            missing_threshold,
            repeat_interval,
            repeat_message,
            logger,
        } = self;

        let top_tier = tiers.last();
        let mut requests = Vec::new();

        for identity in identities.values_mut() {
            if seen.contains(&identity.display_id) || !identity.watched_in_pool() {
                continue;
            }
            let id = identity.display_id;
            let elapsed = now - identity.last_seen;

            if elapsed >= *submerge_grace && !identity.submerged {
                identity.submerged = true;
                registry.submerge(SubmergedCandidate::from_identity(identity));
            }

            if elapsed >= *missing_threshold && !identity.counted_missing {
                identity.counted_missing = true;
                *missing_in_pool += 1;
                logger.warn(&format!(
                    "{} missing in the pool for {:.0}s ({} missing)",
                    id, elapsed, missing_in_pool
                ));
            }

            if identity.acknowledged {
                continue;
            }

            let level_at_start = identity.alert_level;
            if let Some(tier) = tiers
                .iter()
                .find(|tier| elapsed >= tier.seconds && tier.level > identity.alert_level)
            {
                identity.alert_level = tier.level;
                identity.last_repeat_alert_at = Some(now);
                logger.warn(&format!(
                    "{} unseen for {:.1}s, alert level {}",
                    id, elapsed, tier.level
                ));
                requests.push(AlertRequest {
                    display_id: id,
                    kind: AlertKind::Tier(tier.level),
                    elapsed,
                    caption: render_caption(&tier.message, id, elapsed),
                });
            }

            if let Some(top) = top_tier {
                let repeat_due = identity
                    .last_repeat_alert_at
                    .map_or(true, |at| now - at >= *repeat_interval);
                if level_at_start >= top.level && elapsed >= top.seconds && repeat_due {
                    identity.last_repeat_alert_at = Some(now);
                    logger.warn(&format!("{} still missing after {:.0}s", id, elapsed));
                    requests.push(AlertRequest {
                        display_id: id,
                        kind: AlertKind::Repeat,
                        elapsed,
                        caption: render_caption(repeat_message, id, elapsed),
                    });
                }
            }
        }

        requests
    }

    /// Retires identities with an active alert; others are left untouched.
    pub fn rescue(
        &mut self,
        target: RescueTarget,
        registry: &mut IdentityRegistry,
    ) -> Vec<DisplayId> {
        let targets: Vec<DisplayId> = self
            .identities
            .values()
            .filter(|identity| match target {
                RescueTarget::One(id) => identity.display_id == id,
                RescueTarget::All => true,
            })
            .filter(|identity| identity.has_active_alert())
            .map(|identity| identity.display_id)
            .collect();

        for id in &targets {
            registry.withdraw(*id);
            if let Some(identity) = self.identities.remove(id) {
                if identity.counted_missing {
                    self.missing_in_pool = self.missing_in_pool.saturating_sub(1);
                }
            }
            self.logger.record(&format!("{} rescued", id));
        }
        targets
    }

    /// Stops escalation for a missing identity without retiring it.
    pub fn acknowledge(&mut self, id: DisplayId) -> bool {
        match self.identities.get_mut(&id) {
            Some(identity) if identity.has_active_alert() && !identity.acknowledged => {
                identity.acknowledged = true;
                self.logger.record(&format!(
                    "{} acknowledged at level {}",
                    id, identity.alert_level
                ));
                true
            }
            _ => false,
        }
    }

    pub fn missing_in_pool(&self) -> usize {
        self.missing_in_pool
    }

    pub fn identity(&self, id: DisplayId) -> Option<&Identity> {
        self.identities.get(&id)
    }

    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.identities.values()
    }

    pub fn alert_level(&self, id: DisplayId) -> Option<u8> {
        self.identities.get(&id).map(|identity| identity.alert_level)
    }

    pub fn state_of(&self, id: DisplayId) -> Option<PresenceState> {
        self.identities.get(&id).map(|identity| {
            if identity.acknowledged {
                PresenceState::Acknowledged
            } else if identity.has_active_alert() {
                PresenceState::Missing {
                    level: identity.alert_level,
                }
            } else {
                PresenceState::Visible
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (MissingPersonMonitor, IdentityRegistry) {
        let config = MonitorConfig::default();
        (
            MissingPersonMonitor::new(&config),
            IdentityRegistry::new(&config),
        )
    }

    fn run_until(
        monitor: &mut MissingPersonMonitor,
        registry: &mut IdentityRegistry,
        from: f64,
        to: f64,
    ) -> Vec<(f64, AlertKind)> {
        let seen = HashSet::new();
        let mut fired = Vec::new();
        let mut t = from;
        while t <= to + 1e-9 {
            for request in monitor.evaluate(&seen, t, registry) {
                fired.push((t, request.kind));
            }
            t += 0.5;
        }
        fired
    }

    #[test]
    fn default_timeline_escalates_then_repeats() {
        let (mut monitor, mut registry) = setup();
        monitor.observe(DisplayId(1), Point::new(50.0, 50.0), ZoneKind::Pool, 0.0, false);

        let fired = run_until(&mut monitor, &mut registry, 0.5, 60.0);
        assert_eq!(
            fired,
            vec![
                (20.0, AlertKind::Tier(1)),
                (25.0, AlertKind::Tier(2)),
                (30.0, AlertKind::Tier(3)),
                (35.0, AlertKind::Tier(4)),
                (40.0, AlertKind::Tier(5)),
                (50.0, AlertKind::Repeat),
                (60.0, AlertKind::Repeat),
            ]
        );
        assert_eq!(monitor.missing_in_pool(), 1);
        assert!(registry.is_submerged(DisplayId(1)));
    }

    #[test]
    fn late_evaluation_fires_one_tier_per_cycle() {
        let (mut monitor, mut registry) = setup();
        monitor.observe(DisplayId(2), Point::default(), ZoneKind::Pool, 0.0, false);
        let seen = HashSet::new();

        let first = monitor.evaluate(&seen, 33.0, &mut registry);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, AlertKind::Tier(1));
        let second = monitor.evaluate(&seen, 33.1, &mut registry);
        assert_eq!(second[0].kind, AlertKind::Tier(2));
        assert_eq!(monitor.alert_level(DisplayId(2)), Some(2));
    }

    #[test]
    fn reappearance_resets_level_and_counter() {
        let (mut monitor, mut registry) = setup();
        monitor.observe(DisplayId(1), Point::default(), ZoneKind::Pool, 0.0, false);
        run_until(&mut monitor, &mut registry, 0.5, 45.0);
        assert_eq!(monitor.alert_level(DisplayId(1)), Some(5));
        assert_eq!(monitor.missing_in_pool(), 1);

        monitor.observe(DisplayId(1), Point::default(), ZoneKind::Pool, 46.0, false);
        assert_eq!(monitor.alert_level(DisplayId(1)), Some(0));
        assert_eq!(monitor.missing_in_pool(), 0);
        assert_eq!(monitor.state_of(DisplayId(1)), Some(PresenceState::Visible));
    }

    #[test]
    fn swimmer_who_left_for_the_deck_is_not_timed() {
        let (mut monitor, mut registry) = setup();
        monitor.observe(DisplayId(1), Point::default(), ZoneKind::Pool, 0.0, false);
        monitor.observe(DisplayId(1), Point::default(), ZoneKind::Safe, 1.0, false);
        let fired = run_until(&mut monitor, &mut registry, 1.5, 90.0);
        assert!(fired.is_empty());
        assert!(registry.candidates().is_empty());
        assert_eq!(monitor.missing_in_pool(), 0);
    }

    #[test]
    fn back_in_the_water_restarts_timing() {
        let (mut monitor, mut registry) = setup();
        monitor.observe(DisplayId(1), Point::default(), ZoneKind::Safe, 0.0, true);
        monitor.observe(DisplayId(1), Point::default(), ZoneKind::Pool, 5.0, true);
        let fired = run_until(&mut monitor, &mut registry, 5.5, 25.0);
        assert_eq!(fired, vec![(25.0, AlertKind::Tier(1))]);
    }

    #[test]
    fn outside_sightings_do_not_start_timers() {
        let (mut monitor, mut registry) = setup();
        monitor.observe(DisplayId(9), Point::default(), ZoneKind::Outside, 0.0, false);
        assert!(run_until(&mut monitor, &mut registry, 1.0, 50.0).is_empty());
    }

    #[test]
    fn rescue_retires_only_alerting_identities() {
        let (mut monitor, mut registry) = setup();
        monitor.observe(DisplayId(1), Point::default(), ZoneKind::Pool, 0.0, false);
        monitor.observe(DisplayId(2), Point::default(), ZoneKind::Pool, 0.0, false);
        let seen: HashSet<DisplayId> = [DisplayId(2)].into_iter().collect();
        monitor.observe(DisplayId(2), Point::default(), ZoneKind::Pool, 41.0, false);
        monitor.evaluate(&seen, 41.0, &mut registry);
        assert_eq!(monitor.missing_in_pool(), 1);

        assert!(monitor
            .rescue(RescueTarget::One(DisplayId(2)), &mut registry)
            .is_empty());
        assert_eq!(
            monitor.rescue(RescueTarget::All, &mut registry),
            vec![DisplayId(1)]
        );
        assert_eq!(monitor.missing_in_pool(), 0);
        assert!(monitor.identity(DisplayId(1)).is_none());
        assert!(!registry.is_submerged(DisplayId(1)));
        assert!(monitor.identity(DisplayId(2)).is_some());

        assert!(monitor.rescue(RescueTarget::All, &mut registry).is_empty());
    }

    #[test]
    fn acknowledged_identity_stops_escalating() {
        let (mut monitor, mut registry) = setup();
        monitor.observe(DisplayId(1), Point::default(), ZoneKind::Pool, 0.0, false);
        run_until(&mut monitor, &mut registry, 0.5, 21.0);
        assert!(monitor.acknowledge(DisplayId(1)));
        assert_eq!(
            monitor.state_of(DisplayId(1)),
            Some(PresenceState::Acknowledged)
        );
        assert!(run_until(&mut monitor, &mut registry, 21.5, 80.0).is_empty());
        assert_eq!(monitor.missing_in_pool(), 1);
    }

    #[test]
    fn restore_releases_live_counter() {
        let (mut monitor, mut registry) = setup();
        monitor.observe(DisplayId(1), Point::new(10.0, 10.0), ZoneKind::Pool, 0.0, false);
        run_until(&mut monitor, &mut registry, 0.5, 42.0);
        let candidate = registry.withdraw(DisplayId(1)).unwrap();
        assert!(!candidate.saved.counted_missing);
        assert_eq!(monitor.missing_in_pool(), 1);

        monitor.restore(candidate.saved, Point::new(20.0, 10.0), 43.0);
        assert_eq!(monitor.missing_in_pool(), 0);
        let identity = monitor.identity(DisplayId(1)).unwrap();
        assert_eq!(identity.alert_level, 0);
        assert_eq!(identity.last_position, Point::new(20.0, 10.0));
    }
}
