//! Optional movement and fire-rate validation
//!
//! Violations accumulate per connection; low-severity ones drop the offending
//! message, repeated severe ones terminate the connection.

use std::time::{Duration, Instant};

use crate::ws::protocol::WeaponId;

/// Largest plausible displacement between two consecutive move messages
pub const MAX_STEP: f32 = 2.5;

/// Displacement treated as a teleport (severe violation)
pub const TELEPORT_STEP: f32 = 10.0;

/// Violations before the connection is kicked
pub const KICK_THRESHOLD: u32 = 10;

/// Severe violations count this many times toward the threshold
const SEVERE_WEIGHT: u32 = 5;

/// Minimum interval between shots per weapon, with client jitter slack
fn min_fire_interval(weapon: WeaponId) -> Duration {
    let millis = match weapon {
        WeaponId::Knife => 250,
        WeaponId::Ak47 => 80,
        WeaponId::Deagle => 200,
        WeaponId::Awp => 1000,
        WeaponId::Rpg => 1500,
    };
    // 80% of nominal, so honest clients near the cap are never flagged
    Duration::from_millis(millis * 8 / 10)
}

/// Verdict for a checked message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    /// Drop the message, no state change
    Drop,
    /// Terminate the connection
    Kick,
}

/// Per-connection violation ledger
#[derive(Debug, Default)]
pub struct CheatLedger {
    last_pos: Option<(f32, f32, f32)>,
    last_shot: Option<Instant>,
    violations: u32,
}

impl CheatLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the movement baseline after a legitimate warp (join, respawn)
    pub fn reset_position(&mut self) {
        self.last_pos = None;
    }

    pub fn violations(&self) -> u32 {
        self.violations
    }

    /// Validate a move message against the previous position
    pub fn check_move(&mut self, x: f32, y: f32, z: f32) -> Verdict {
        let verdict = match self.last_pos {
            Some((px, py, pz)) => {
                let dx = x - px;
                let dy = y - py;
                let dz = z - pz;
                let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                if dist > TELEPORT_STEP {
                    self.bump(true)
                } else if dist > MAX_STEP {
                    self.bump(false)
                } else {
                    Verdict::Ok
                }
            }
            None => Verdict::Ok,
        };

        if verdict == Verdict::Ok {
            self.last_pos = Some((x, y, z));
        }
        verdict
    }

    /// Validate shot timing against the weapon's fire rate
    pub fn check_shot(&mut self, weapon: WeaponId, now: Instant) -> Verdict {
        let verdict = match self.last_shot {
            Some(prev) if now.duration_since(prev) < min_fire_interval(weapon) => self.bump(false),
            _ => Verdict::Ok,
        };

        if verdict == Verdict::Ok {
            self.last_shot = Some(now);
        }
        verdict
    }

    fn bump(&mut self, severe: bool) -> Verdict {
        self.violations += if severe { SEVERE_WEIGHT } else { 1 };
        if self.violations >= KICK_THRESHOLD {
            Verdict::Kick
        } else {
            Verdict::Drop
        }
    }
}
