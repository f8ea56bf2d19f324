//! Hitscan combat resolution: ray-sphere intersection, headshots, explosions

use std::collections::BTreeMap;

use crate::ws::protocol::{GameMode, Team, WeaponId};

use super::room::Player;
use super::ClientId;

/// Player bounding sphere radius
pub const PLAYER_HIT_RADIUS: f32 = 0.8;

/// Absolute maximum hitscan range
pub const MAX_SHOT_RANGE: f32 = 100.0;

/// Maximum range for prop pushes along a shot ray
pub const MAX_PUSH_RANGE: f32 = 80.0;

/// Vertical offset of the head band above the player origin
pub const EYE_OFFSET: f32 = 0.5;

/// Half-height of the headshot band
pub const HEADSHOT_BAND: f32 = 0.3;

pub const HEADSHOT_MULTIPLIER: i32 = 3;

/// RPG blast damage at the blast center
pub const RPG_BASE_DAMAGE: i32 = 150;

/// Resolved shot against a player
#[derive(Debug, Clone, Copy)]
pub struct ShotHit {
    pub target: ClientId,
    pub distance: f32,
    pub damage: i32,
    pub headshot: bool,
}

/// Ray-sphere intersection. Returns the smaller positive root, falling back
/// to the larger when the origin is inside the sphere.
#[allow(clippy::too_many_arguments)]
pub fn ray_sphere(
    ox: f32,
    oy: f32,
    oz: f32,
    dx: f32,
    dy: f32,
    dz: f32,
    tx: f32,
    ty: f32,
    tz: f32,
    radius: f32,
) -> Option<f32> {
    let ex = ox - tx;
    let ey = oy - ty;
    let ez = oz - tz;
    let a = dx * dx + dy * dy + dz * dz;
    let b = 2.0 * (ex * dx + ey * dy + ez * dz);
    let c = ex * ex + ey * ey + ez * ez - radius * radius;

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    if t1 > 0.0 {
        Some(t1)
    } else if t2 > 0.0 {
        Some(t2)
    } else {
        None
    }
}

/// Headshot test: the ray's height at the hit distance must fall within the
/// head band around the target's eye height.
pub fn is_headshot(origin_y: f32, dir_y: f32, distance: f32, target_y: f32) -> bool {
    ((origin_y + dir_y * distance) - (target_y + EYE_OFFSET)).abs() < HEADSHOT_BAND
}

/// Resolve a hitscan shot against the room's player set.
///
/// Targets are scanned in ascending player-id order and the first ray-sphere
/// hit under the max range wins, regardless of whether a later player would
/// be geometrically nearer. Clients resolve their own visuals by the same
/// ordered scan, so server authority and client display stay in agreement.
pub fn resolve_shot(
    shooter: ClientId,
    shooter_team: Team,
    origin: (f32, f32, f32),
    dir: (f32, f32, f32),
    weapon: WeaponId,
    mode: GameMode,
    players: &BTreeMap<ClientId, Player>,
) -> Option<ShotHit> {
    let base_damage = weapon.spec().damage;

    for (&pid, p) in players {
        if pid == shooter || !p.alive {
            continue;
        }
        if mode != GameMode::Ffa && p.team == shooter_team {
            continue;
        }

        let hit = ray_sphere(
            origin.0,
            origin.1,
            origin.2,
            dir.0,
            dir.1,
            dir.2,
            p.x,
            p.y,
            p.z,
            PLAYER_HIT_RADIUS,
        );
        if let Some(t) = hit {
            if t < MAX_SHOT_RANGE {
                let headshot = is_headshot(origin.1, dir.1, t, p.y);
                let damage = if headshot {
                    base_damage * HEADSHOT_MULTIPLIER
                } else {
                    base_damage
                };
                return Some(ShotHit {
                    target: pid,
                    distance: t,
                    damage,
                    headshot,
                });
            }
        }
    }

    None
}

/// Blast damage with linear falloff, floored to an integer
pub fn explosion_damage(base: i32, dist: f32, radius: f32) -> i32 {
    if dist >= radius {
        return 0;
    }
    (base as f32 * (1.0 - dist / radius)).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::GameMode;

    fn player(id: ClientId, team: Team, x: f32, y: f32, z: f32) -> Player {
        Player::new(id, format!("p{id}"), team, x, y, z)
    }

    #[test]
    fn ray_sphere_prefers_smaller_positive_root() {
        // Ray from origin along +x toward a unit sphere at x=10
        let t = ray_sphere(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 10.0, 0.0, 0.0, 1.0).unwrap();
        assert!((t - 9.0).abs() < 1e-4);

        // Origin inside the sphere: larger root (exit point)
        let t = ray_sphere(10.0, 0.0, 0.0, 1.0, 0.0, 0.0, 10.0, 0.0, 0.0, 1.0).unwrap();
        assert!((t - 1.0).abs() < 1e-4);

        // Sphere behind the ray
        assert!(ray_sphere(0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 10.0, 0.0, 0.0, 1.0).is_none());
        // Ray misses
        assert!(ray_sphere(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 10.0, 5.0, 0.0, 1.0).is_none());
    }

    #[test]
    fn ray_sphere_is_translation_invariant() {
        let (cx, cy, cz) = (13.0, -4.0, 7.5);
        let (ox, oy, oz) = (1.0, 2.0, 3.0);
        let (dx, dy, dz) = (0.6, 0.0, 0.8);

        let at_center = ray_sphere(ox, oy, oz, dx, dy, dz, cx, cy, cz, 2.0);
        let at_origin = ray_sphere(ox - cx, oy - cy, oz - cz, dx, dy, dz, 0.0, 0.0, 0.0, 2.0);
        match (at_center, at_origin) {
            (Some(a), Some(b)) => assert!((a - b).abs() < 1e-4),
            (None, None) => {}
            other => panic!("asymmetric result: {other:?}"),
        }
    }

    #[test]
    fn headshot_triples_damage_for_every_weapon() {
        let mut players = BTreeMap::new();
        players.insert(2, player(2, Team::Ct, 10.0, 1.5, 0.0));

        for weapon in WeaponId::all() {
            let shot = |origin_y| {
                resolve_shot(
                    1,
                    Team::T,
                    (0.0, origin_y, 0.0),
                    (1.0, 0.0, 0.0),
                    weapon,
                    GameMode::Deathmatch,
                    &players,
                )
                .unwrap()
            };
            // Flat ray at torso height misses the head band; one raised by
            // the eye offset runs straight through it
            let body = shot(1.5);
            let head = shot(2.0);
            assert!(!body.headshot);
            assert!(head.headshot);
            assert_eq!(body.damage, weapon.spec().damage);
            assert_eq!(head.damage, body.damage * 3, "{weapon:?}");
        }
    }

    #[test]
    fn ak47_body_shot_at_distance_ten() {
        let mut players = BTreeMap::new();
        players.insert(2, player(2, Team::Ct, 10.0, 1.5, 0.0));

        let hit = resolve_shot(
            1,
            Team::T,
            (0.0, 1.5, 0.0),
            (1.0, 0.0, 0.0),
            WeaponId::Ak47,
            GameMode::Deathmatch,
            &players,
        )
        .unwrap();

        // Flat ray through the target center at eye-band offset 0.5: body shot
        assert!(!hit.headshot);
        assert_eq!(hit.damage, 27);
        assert!((hit.distance - (10.0 - PLAYER_HIT_RADIUS)).abs() < 1e-3);
    }

    #[test]
    fn headshot_band_detection() {
        let mut players = BTreeMap::new();
        players.insert(2, player(2, Team::Ct, 10.0, 1.5, 0.0));

        // Aim at the head band: origin raised by the eye offset
        let hit = resolve_shot(
            1,
            Team::T,
            (0.0, 2.0, 0.0),
            (1.0, 0.0, 0.0),
            WeaponId::Ak47,
            GameMode::Deathmatch,
            &players,
        )
        .unwrap();
        assert!(hit.headshot);
        assert_eq!(hit.damage, 81);
    }

    #[test]
    fn teammates_are_skipped_except_in_ffa() {
        let mut players = BTreeMap::new();
        players.insert(2, player(2, Team::T, 10.0, 1.5, 0.0));

        let shot = |mode| {
            resolve_shot(
                1,
                Team::T,
                (0.0, 1.5, 0.0),
                (1.0, 0.0, 0.0),
                WeaponId::Ak47,
                mode,
                &players,
            )
        };
        assert!(shot(GameMode::Deathmatch).is_none());
        assert!(shot(GameMode::Ffa).is_some());
    }

    #[test]
    fn dead_targets_and_range_are_respected() {
        let mut players = BTreeMap::new();
        let mut dead = player(2, Team::Ct, 10.0, 1.5, 0.0);
        dead.alive = false;
        players.insert(2, dead);
        players.insert(3, player(3, Team::Ct, 150.0, 1.5, 0.0));

        let hit = resolve_shot(
            1,
            Team::T,
            (0.0, 1.5, 0.0),
            (1.0, 0.0, 0.0),
            WeaponId::Ak47,
            GameMode::Deathmatch,
            &players,
        );
        assert!(hit.is_none(), "dead target skipped, live one out of range");
    }

    #[test]
    fn first_hit_in_id_order_wins_over_nearest() {
        // Player 2 is farther along the ray than player 3, but has the lower
        // id, so the ordered scan resolves against player 2.
        let mut players = BTreeMap::new();
        players.insert(2, player(2, Team::Ct, 20.0, 1.5, 0.0));
        players.insert(3, player(3, Team::Ct, 10.0, 1.5, 0.0));

        let hit = resolve_shot(
            1,
            Team::T,
            (0.0, 1.5, 0.0),
            (1.0, 0.0, 0.0),
            WeaponId::Ak47,
            GameMode::Deathmatch,
            &players,
        )
        .unwrap();
        assert_eq!(hit.target, 2);
    }

    #[test]
    fn rpg_falloff_matches_linear_floor() {
        assert_eq!(explosion_damage(150, 4.0, 8.0), 75);
        assert_eq!(explosion_damage(150, 0.0, 8.0), 150);
        assert_eq!(explosion_damage(150, 8.0, 8.0), 0);
        assert_eq!(explosion_damage(150, 9.0, 8.0), 0);
    }
}
