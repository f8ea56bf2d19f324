//! Hostage mode: pickup, following, and rescue

use std::collections::BTreeMap;

use crate::ws::protocol::{HostageSnapshot, Team};

use super::map::Circle;
use super::room::Player;
use super::ClientId;

/// Max distance for a CT player to pick up an idle hostage
pub const PICKUP_RADIUS: f32 = 3.0;

/// The hostage only moves when farther than this from its carrier
pub const FOLLOW_DISTANCE: f32 = 2.0;

/// Distance covered per tick while following
pub const FOLLOW_STEP: f32 = 0.3;

/// State machine: idle (`following: None`) -> following -> rescued (terminal).
/// A carrier death or leave clears `following`, leaving the hostage in place.
#[derive(Debug, Clone)]
pub struct Hostage {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rescued: bool,
    pub following: Option<ClientId>,
}

impl Hostage {
    pub fn new(id: u32, x: f32, z: f32) -> Self {
        Self {
            id,
            x,
            y: 1.0,
            z,
            rescued: false,
            following: None,
        }
    }

    pub fn idle(&self) -> bool {
        !self.rescued && self.following.is_none()
    }

    pub fn snapshot(&self) -> HostageSnapshot {
        HostageSnapshot {
            id: self.id,
            x: self.x,
            y: self.y,
            z: self.z,
            rescued: self.rescued,
            following: self.following,
        }
    }
}

/// Attempt a pickup. Returns true when the hostage transitioned to following.
pub fn try_pickup(hostages: &mut [Hostage], player: &Player, hostage_id: u32) -> bool {
    if !player.alive || player.team != Team::Ct {
        return false;
    }

    let Some(h) = hostages.iter_mut().find(|h| h.id == hostage_id) else {
        return false;
    };
    if !h.idle() {
        return false;
    }

    let dx = h.x - player.x;
    let dz = h.z - player.z;
    if dx * dx + dz * dz > PICKUP_RADIUS * PICKUP_RADIUS {
        return false;
    }

    h.following = Some(player.id);
    true
}

/// Advance following hostages one tick. Returns (hostage id, carrier id) for
/// every hostage that reached the rescue zone this tick.
pub fn advance(
    hostages: &mut [Hostage],
    players: &BTreeMap<ClientId, Player>,
    rescue_zone: Circle,
) -> Vec<(u32, ClientId)> {
    let mut rescued = Vec::new();

    for h in hostages.iter_mut() {
        if h.rescued {
            continue;
        }
        let Some(carrier_id) = h.following else {
            continue;
        };

        // Carrier gone or dead: drop back to idle in place
        let carrier = match players.get(&carrier_id) {
            Some(p) if p.alive => p,
            _ => {
                h.following = None;
                continue;
            }
        };

        let dx = carrier.x - h.x;
        let dz = carrier.z - h.z;
        let dist = (dx * dx + dz * dz).sqrt();
        if dist > FOLLOW_DISTANCE {
            let inv = 1.0 / dist.max(0.001);
            h.x += dx * inv * FOLLOW_STEP;
            h.z += dz * inv * FOLLOW_STEP;
        }

        if rescue_zone.contains_xz(h.x, h.z) {
            h.rescued = true;
            h.following = None;
            rescued.push((h.id, carrier_id));
        }
    }

    rescued
}

/// Release any hostage carried by the given player (death or leave).
/// Returns the released hostage id, if any.
pub fn release_carrier(hostages: &mut [Hostage], player_id: ClientId) -> Option<u32> {
    for h in hostages.iter_mut() {
        if h.following == Some(player_id) {
            h.following = None;
            return Some(h.id);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ct(id: ClientId, x: f32, z: f32) -> Player {
        Player::new(id, format!("ct{id}"), Team::Ct, x, 1.5, z)
    }

    fn zone() -> Circle {
        Circle {
            x: 20.0,
            z: 0.0,
            radius: 5.0,
        }
    }

    #[test]
    fn pickup_requires_living_ct_in_range() {
        let mut hostages = vec![Hostage::new(1, 0.0, 0.0)];

        let mut t = Player::new(2, "t".to_string(), Team::T, 0.0, 1.5, 0.0);
        assert!(!try_pickup(&mut hostages, &t, 1));
        t.team = Team::Ct;
        t.alive = false;
        assert!(!try_pickup(&mut hostages, &t, 1));

        let far = ct(3, 10.0, 0.0);
        assert!(!try_pickup(&mut hostages, &far, 1));

        let near = ct(4, 1.0, 0.0);
        assert!(try_pickup(&mut hostages, &near, 1));
        assert_eq!(hostages[0].following, Some(4));

        // Already carried: second pickup fails
        let other = ct(5, 0.5, 0.0);
        assert!(!try_pickup(&mut hostages, &other, 1));
    }

    #[test]
    fn following_hostage_walks_to_rescue_exactly_once() {
        let mut hostages = vec![Hostage::new(1, 14.0, 0.0)];
        let mut players = BTreeMap::new();
        players.insert(4, ct(4, 20.0, 0.0));
        hostages[0].following = Some(4);

        let mut rescues = Vec::new();
        for _ in 0..200 {
            rescues.extend(advance(&mut hostages, &players, zone()));
        }

        assert_eq!(rescues, vec![(1, 4)]);
        assert!(hostages[0].rescued);
        assert!(hostages[0].following.is_none());

        // Terminal: no pickup, no further rescue
        let p = players.get(&4).unwrap().clone();
        assert!(!try_pickup(&mut hostages, &p, 1));
        assert!(advance(&mut hostages, &players, zone()).is_empty());
    }

    #[test]
    fn carrier_death_reverts_to_idle_in_place() {
        let mut hostages = vec![Hostage::new(1, 0.0, 0.0)];
        let mut players = BTreeMap::new();
        players.insert(4, ct(4, 1.0, 0.0));
        hostages[0].following = Some(4);

        players.get_mut(&4).unwrap().alive = false;
        let rescues = advance(&mut hostages, &players, zone());
        assert!(rescues.is_empty());
        assert!(hostages[0].idle());
        assert_eq!(hostages[0].x, 0.0);
    }

    #[test]
    fn stationary_carrier_still_reels_the_hostage_in() {
        let mut hostages = vec![Hostage::new(1, 10.0, 0.0)];
        let mut players = BTreeMap::new();
        players.insert(4, ct(4, 0.0, 0.0));
        hostages[0].following = Some(4);

        advance(&mut hostages, &players, Circle { x: -50.0, z: 0.0, radius: 1.0 });
        assert!((hostages[0].x - (10.0 - FOLLOW_STEP)).abs() < 1e-4);

        // Inside follow distance: stays put
        hostages[0].x = 1.0;
        advance(&mut hostages, &players, Circle { x: -50.0, z: 0.0, radius: 1.0 });
        assert_eq!(hostages[0].x, 1.0);
    }
}
