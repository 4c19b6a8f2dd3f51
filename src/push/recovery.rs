//! Bounded auto-recovery state machine
//!
//! `Idle → DriftDetected → Recovering → Recovered | Exhausted`
//!
//! The controller only decides; the session runs the delayed attempts. It is
//! kept behind a mutex and every transition is synchronous, so observing a
//! drift and claiming the in-flight slot happen in one step.

use serde::Serialize;

use super::SyncState;
use crate::{error::ErrorKind, types::PermissionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryState {
    Idle,
    DriftDetected,
    Recovering,
    Recovered,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to recover.
    Settled,
    Schedule { attempt: u32 },
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PermissionNotGranted,
    InstallRequired,
    InFlight,
    Exhausted,
    /// The last attempt failed in a way retrying cannot fix.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecoveryStatus {
    pub state: RecoveryState,
    pub attempts: u32,
    pub max_attempts: u32,
}

#[derive(Debug)]
pub struct RecoveryController {
    state: RecoveryState,
    attempts: u32,
    max_attempts: u32,
}

impl RecoveryController {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: RecoveryState::Idle,
            attempts: 0,
            max_attempts,
        }
    }

    pub fn status(&self) -> RecoveryStatus {
        RecoveryStatus {
            state: self.state,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Feeds the result of a state read.
    pub fn observe(
        &mut self,
        sync: SyncState,
        permission: PermissionState,
    ) -> Decision {
        if !sync.needs_recovery() {
            if matches!(
                self.state,
                RecoveryState::DriftDetected | RecoveryState::Recovered
            ) {
                self.state = RecoveryState::Idle;
            }
            return Decision::Settled;
        }

        match self.state {
            RecoveryState::Recovering => {
                return Decision::Skip(SkipReason::InFlight);
            },
            RecoveryState::Exhausted => {
                return Decision::Skip(SkipReason::Exhausted);
            },
            _ => {},
        }

        self.state = RecoveryState::DriftDetected;

        if !permission.is_granted() {
            return Decision::Skip(SkipReason::PermissionNotGranted);
        }

        self.schedule_next()
    }

    pub fn on_recovered(&mut self) {
        self.attempts = 0;
        self.state = RecoveryState::Recovered;
    }

    /// An automatic attempt failed; decides whether another one follows.
    pub fn on_failure(&mut self, kind: ErrorKind) -> Decision {
        match kind {
            ErrorKind::Transient => {
                self.state = RecoveryState::DriftDetected;
                self.schedule_next()
            },
            ErrorKind::Terminal => {
                self.state = RecoveryState::DriftDetected;
                Decision::Skip(SkipReason::PermissionNotGranted)
            },
            ErrorKind::Configuration | ErrorKind::Platform => {
                self.state = RecoveryState::Exhausted;
                Decision::Skip(SkipReason::Fatal)
            },
        }
    }

    /// The in-flight attempt ended without calling the registrar.
    pub fn release(&mut self, sync: SyncState) {
        if self.state != RecoveryState::Recovering {
            return;
        }

        self.state = if sync.needs_recovery() {
            RecoveryState::DriftDetected
        } else {
            RecoveryState::Idle
        };
    }

    /// A manual registration succeeded; clears any exhaustion.
    pub fn on_registered(&mut self) {
        self.attempts = 0;
        if self.state != RecoveryState::Recovering {
            self.state = RecoveryState::Recovered;
        }
    }

    fn schedule_next(&mut self) -> Decision {
        if self.attempts >= self.max_attempts {
            self.state = RecoveryState::Exhausted;
            return Decision::Skip(SkipReason::Exhausted);
        }

        self.attempts += 1;
        self.state = RecoveryState::Recovering;
        Decision::Schedule {
            attempt: self.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRANTED: PermissionState = PermissionState::Granted;

    #[test]
    fn test_drift_with_permission_schedules_first_attempt() {
        let mut controller = RecoveryController::new(3);

        let decision = controller.observe(SyncState::Missing, GRANTED);

        assert_eq!(decision, Decision::Schedule { attempt: 1 });
        assert_eq!(controller.state(), RecoveryState::Recovering);
    }

    #[test]
    fn test_permission_not_granted_stays_in_drift_detected() {
        let mut controller = RecoveryController::new(3);

        for permission in [PermissionState::Default, PermissionState::Denied] {
            let decision = controller.observe(SyncState::Drift, permission);
            assert_eq!(
                decision,
                Decision::Skip(SkipReason::PermissionNotGranted)
            );
        }
        assert_eq!(controller.state(), RecoveryState::DriftDetected);
        assert_eq!(controller.attempts(), 0);
    }

    #[test]
    fn test_second_observation_while_recovering_is_single_flight() {
        let mut controller = RecoveryController::new(3);

        controller.observe(SyncState::Missing, GRANTED);
        let decision = controller.observe(SyncState::Missing, GRANTED);

        assert_eq!(decision, Decision::Skip(SkipReason::InFlight));
        assert_eq!(controller.attempts(), 1);
    }

    #[test]
    fn test_transient_failures_exhaust_after_max_attempts() {
        let mut controller = RecoveryController::new(3);

        assert_eq!(
            controller.observe(SyncState::Missing, GRANTED),
            Decision::Schedule { attempt: 1 }
        );
        assert_eq!(
            controller.on_failure(ErrorKind::Transient),
            Decision::Schedule { attempt: 2 }
        );
        assert_eq!(
            controller.on_failure(ErrorKind::Transient),
            Decision::Schedule { attempt: 3 }
        );
        assert_eq!(
            controller.on_failure(ErrorKind::Transient),
            Decision::Skip(SkipReason::Exhausted)
        );
        assert_eq!(controller.state(), RecoveryState::Exhausted);

        assert_eq!(
            controller.observe(SyncState::Drift, GRANTED),
            Decision::Skip(SkipReason::Exhausted)
        );
        assert_eq!(controller.attempts(), 3);
    }

    #[test]
    fn test_success_resets_counter() {
        let mut controller = RecoveryController::new(3);

        controller.observe(SyncState::Missing, GRANTED);
        controller.on_failure(ErrorKind::Transient);
        controller.on_recovered();

        assert_eq!(controller.state(), RecoveryState::Recovered);
        assert_eq!(controller.attempts(), 0);
        assert_eq!(
            controller.observe(SyncState::Consistent, GRANTED),
            Decision::Settled
        );
        assert_eq!(controller.state(), RecoveryState::Idle);
    }

    #[test]
    fn test_configuration_failure_is_not_retried() {
        let mut controller = RecoveryController::new(3);

        controller.observe(SyncState::Missing, GRANTED);
        let decision = controller.on_failure(ErrorKind::Configuration);

        assert_eq!(decision, Decision::Skip(SkipReason::Fatal));
        assert_eq!(controller.state(), RecoveryState::Exhausted);
    }

    #[test]
    fn test_manual_registration_leaves_exhausted() {
        let mut controller = RecoveryController::new(1);

        controller.observe(SyncState::Missing, GRANTED);
        controller.on_failure(ErrorKind::Transient);
        assert_eq!(controller.state(), RecoveryState::Exhausted);

        controller.on_registered();
        assert_eq!(controller.state(), RecoveryState::Recovered);
        assert_eq!(controller.attempts(), 0);
        assert_eq!(
            controller.observe(SyncState::Missing, GRANTED),
            Decision::Schedule { attempt: 1 }
        );
    }

    #[test]
    fn test_release_without_registrar_call() {
        let mut controller = RecoveryController::new(3);

        controller.observe(SyncState::Drift, GRANTED);
        controller.release(SyncState::Consistent);
        assert_eq!(controller.state(), RecoveryState::Idle);

        controller.observe(SyncState::Drift, GRANTED);
        controller.release(SyncState::Drift);
        assert_eq!(controller.state(), RecoveryState::DriftDetected);
        assert_eq!(controller.attempts(), 2);
    }

    #[test]
    fn test_zero_max_attempts_never_schedules() {
        let mut controller = RecoveryController::new(0);

        assert_eq!(
            controller.observe(SyncState::Missing, GRANTED),
            Decision::Skip(SkipReason::Exhausted)
        );
    }
}
