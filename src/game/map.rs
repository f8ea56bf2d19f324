//! Static map catalog: spawn lists, zones, and layout generation

use crate::ws::protocol::{MapId, PropKind, Team};

use super::hostage::Hostage;
use super::physics::{DestructibleWall, PhysicsObject};

/// Fixed spawn location
#[derive(Debug, Clone, Copy)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

const fn spawn(x: f32, z: f32) -> SpawnPoint {
    SpawnPoint { x, y: 1.5, z }
}

/// Circular zone on the ground plane (buy zones, rescue zone)
#[derive(Debug, Clone, Copy)]
pub struct Circle {
    pub x: f32,
    pub z: f32,
    pub radius: f32,
}

impl Circle {
    pub fn contains_xz(&self, x: f32, z: f32) -> bool {
        let dx = x - self.x;
        let dz = z - self.z;
        dx * dx + dz * dz <= self.radius * self.radius
    }
}

/// Per-map configuration
#[derive(Debug, Clone, Copy)]
pub struct MapConfig {
    /// Arena half-extent at zero population
    pub base_size: f32,
    /// Growth per player; zero for fixed maps
    pub expand_per_player: f32,
    pub t_spawns: &'static [SpawnPoint],
    pub ct_spawns: &'static [SpawnPoint],
    pub t_buy_zone: Circle,
    pub ct_buy_zone: Circle,
    /// CT hostage rescue zone
    pub rescue_zone: Circle,
}

impl MapConfig {
    pub fn spawns(&self, team: Team) -> &'static [SpawnPoint] {
        match team {
            Team::T => self.t_spawns,
            Team::Ct => self.ct_spawns,
        }
    }

    pub fn buy_zone(&self, team: Team) -> Circle {
        match team {
            Team::T => self.t_buy_zone,
            Team::Ct => self.ct_buy_zone,
        }
    }

    /// Arena half-extent for the given population
    pub fn size_for(&self, players: usize) -> f32 {
        self.base_size + players as f32 * self.expand_per_player
    }
}

const DUST_T_SPAWNS: [SpawnPoint; 4] = [
    spawn(-20.0, -20.0),
    spawn(-20.0, 20.0),
    spawn(-10.0, 10.0),
    spawn(-15.0, 0.0),
];
const DUST_CT_SPAWNS: [SpawnPoint; 4] = [
    spawn(20.0, -20.0),
    spawn(20.0, 20.0),
    spawn(10.0, -10.0),
    spawn(15.0, 15.0),
];

const ARENA_T_SPAWNS: [SpawnPoint; 3] = [spawn(-12.0, -12.0), spawn(-12.0, 12.0), spawn(-12.0, 0.0)];
const ARENA_CT_SPAWNS: [SpawnPoint; 3] = [spawn(12.0, -12.0), spawn(12.0, 12.0), spawn(12.0, 0.0)];

const WAREHOUSE_T_SPAWNS: [SpawnPoint; 4] = [
    spawn(-16.0, -16.0),
    spawn(-16.0, 16.0),
    spawn(-16.0, 0.0),
    spawn(-8.0, -8.0),
];
const WAREHOUSE_CT_SPAWNS: [SpawnPoint; 4] = [
    spawn(16.0, -16.0),
    spawn(16.0, 16.0),
    spawn(16.0, 0.0),
    spawn(8.0, 8.0),
];

impl MapId {
    pub fn config(self) -> MapConfig {
        match self {
            MapId::Dust => MapConfig {
                base_size: 50.0,
                expand_per_player: 0.0,
                t_spawns: &DUST_T_SPAWNS,
                ct_spawns: &DUST_CT_SPAWNS,
                t_buy_zone: Circle { x: -20.0, z: 0.0, radius: 8.0 },
                ct_buy_zone: Circle { x: 20.0, z: 0.0, radius: 8.0 },
                rescue_zone: Circle { x: 20.0, z: 0.0, radius: 5.0 },
            },
            MapId::Arena => MapConfig {
                base_size: 30.0,
                expand_per_player: 5.0,
                t_spawns: &ARENA_T_SPAWNS,
                ct_spawns: &ARENA_CT_SPAWNS,
                t_buy_zone: Circle { x: -12.0, z: 0.0, radius: 8.0 },
                ct_buy_zone: Circle { x: 12.0, z: 0.0, radius: 8.0 },
                rescue_zone: Circle { x: 12.0, z: 0.0, radius: 5.0 },
            },
            MapId::Warehouse => MapConfig {
                base_size: 40.0,
                expand_per_player: 0.0,
                t_spawns: &WAREHOUSE_T_SPAWNS,
                ct_spawns: &WAREHOUSE_CT_SPAWNS,
                t_buy_zone: Circle { x: -16.0, z: 0.0, radius: 8.0 },
                ct_buy_zone: Circle { x: 16.0, z: 0.0, radius: 8.0 },
                rescue_zone: Circle { x: 16.0, z: 0.0, radius: 5.0 },
            },
        }
    }
}

/// Deterministic prop layout for a map at the given arena size
pub fn generate_props(map: MapId, size: f32) -> Vec<PhysicsObject> {
    let mut props = Vec::new();
    let mut id = 0;
    let mut push = |props: &mut Vec<PhysicsObject>, kind, x, z| {
        id += 1;
        props.push(PhysicsObject::new(id, kind, x, z));
    };

    match map {
        MapId::Dust => {
            for i in 0..4 {
                let a = i as f32 * std::f32::consts::FRAC_PI_2;
                push(&mut props, PropKind::Barrel, a.cos() * 8.0, a.sin() * 8.0);
            }
            push(&mut props, PropKind::Crate, 0.0, 14.0);
            push(&mut props, PropKind::Crate, 0.0, -14.0);
            push(&mut props, PropKind::Crate, 6.0, 6.0);
        }
        MapId::Arena => {
            // Prop density scales with the arena: one ring per 10 units
            let rings = (size / 10.0) as i32;
            for r in 1..=rings {
                let radius = r as f32 * 8.0;
                let count = 3 + r * 2;
                for i in 0..count {
                    let a = i as f32 / count as f32 * std::f32::consts::TAU;
                    let kind = if (r + i) % 2 == 0 {
                        PropKind::Barrel
                    } else {
                        PropKind::Crate
                    };
                    push(&mut props, kind, a.cos() * radius, a.sin() * radius);
                }
            }
        }
        MapId::Warehouse => {
            for ix in -2..=2 {
                for iz in -2..=2 {
                    if (ix + iz) % 2 != 0 || (ix == 0 && iz == 0) {
                        continue;
                    }
                    push(
                        &mut props,
                        PropKind::Crate,
                        ix as f32 * 7.0,
                        iz as f32 * 7.0,
                    );
                }
            }
            push(&mut props, PropKind::Barrel, 3.0, 0.0);
            push(&mut props, PropKind::Barrel, -3.0, 0.0);
        }
    }

    props
}

/// Deterministic wall layout for a map at the given arena size
pub fn generate_walls(map: MapId, size: f32) -> Vec<DestructibleWall> {
    let mut walls = Vec::new();
    let mut id = 0;
    let mut push = |walls: &mut Vec<DestructibleWall>, x, z, w, d| {
        id += 1;
        walls.push(DestructibleWall::new(id, x, z, w, 3.0, d));
    };

    match map {
        MapId::Dust => {
            push(&mut walls, 0.0, 8.0, 10.0, 1.0);
            push(&mut walls, 0.0, -8.0, 10.0, 1.0);
            push(&mut walls, 8.0, 0.0, 1.0, 10.0);
            push(&mut walls, -8.0, 0.0, 1.0, 10.0);
        }
        MapId::Arena => {
            // Ring of wall segments at 80% of the arena extent
            let ring = size * 0.8;
            let count = (size / 5.0) as i32;
            for i in 0..count {
                let a = i as f32 / count as f32 * std::f32::consts::TAU;
                push(&mut walls, a.cos() * ring, a.sin() * ring, 4.0, 1.0);
            }
        }
        MapId::Warehouse => {
            push(&mut walls, 0.0, 10.0, 14.0, 1.0);
            push(&mut walls, 0.0, -10.0, 14.0, 1.0);
            push(&mut walls, 10.0, 0.0, 1.0, 14.0);
            push(&mut walls, -10.0, 0.0, 1.0, 14.0);
            push(&mut walls, 0.0, 0.0, 6.0, 1.0);
        }
    }

    walls
}

/// Hostage positions, spawned only for hostage mode
pub fn generate_hostages(map: MapId) -> Vec<Hostage> {
    let spots: &[(f32, f32)] = match map {
        MapId::Dust => &[(-18.0, -5.0), (-18.0, 5.0)],
        MapId::Arena => &[(-10.0, -5.0), (-10.0, 5.0)],
        MapId::Warehouse => &[(-14.0, -6.0), (-14.0, 6.0)],
    };
    spots
        .iter()
        .enumerate()
        .map(|(i, &(x, z))| Hostage::new(i as u32 + 1, x, z))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_size_scales_with_population() {
        let cfg = MapId::Arena.config();
        assert_eq!(cfg.size_for(0), 30.0);
        assert_eq!(cfg.size_for(4), 50.0);

        let cfg = MapId::Dust.config();
        assert_eq!(cfg.size_for(0), cfg.size_for(10));
    }

    #[test]
    fn arena_layout_grows_with_size() {
        let small_walls = generate_walls(MapId::Arena, 30.0);
        let big_walls = generate_walls(MapId::Arena, 60.0);
        assert!(big_walls.len() > small_walls.len());

        let small_props = generate_props(MapId::Arena, 30.0);
        let big_props = generate_props(MapId::Arena, 60.0);
        assert!(big_props.len() > small_props.len());
    }

    #[test]
    fn layouts_use_unique_ids() {
        for map in [MapId::Dust, MapId::Arena, MapId::Warehouse] {
            let props = generate_props(map, map.config().base_size);
            let mut ids: Vec<u32> = props.iter().map(|p| p.id).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), props.len());
        }
    }

    #[test]
    fn buy_zone_membership_is_euclidean_xz() {
        let zone = Circle { x: 20.0, z: 0.0, radius: 8.0 };
        assert!(zone.contains_xz(20.0, 0.0));
        assert!(zone.contains_xz(26.0, 4.0));
        assert!(!zone.contains_xz(20.0, 9.0));
    }
}
