//! Prop physics: integration, explosions, and player pushes

use crate::ws::protocol::{PropKind, PropSnapshot, WallSnapshot};

use super::TICK_DT;

/// Downward acceleration applied to airborne props
pub const GRAVITY: f32 = 9.8;

/// Velocity retained (and inverted) on ground bounce
pub const RESTITUTION: f32 = 0.4;

/// Horizontal damping applied on ground contact
pub const GROUND_FRICTION: f32 = 0.8;

/// Uniform horizontal drag per tick
pub const DRAG: f32 = 0.98;

/// Speed below which a grounded prop is considered at rest
pub const REST_EPSILON: f32 = 0.01;

/// RPG blast radius for impulse and player damage
pub const BLAST_RADIUS: f32 = 8.0;

/// Props closer than this to the blast center are destroyed
pub const BLAST_DESTROY_RADIUS: f32 = 3.0;

/// Impulse magnitude at the blast center, falling off linearly
pub const BLAST_IMPULSE: f32 = 12.0;

/// Player bounding radius used for prop pushes
pub const PLAYER_RADIUS: f32 = 0.8;

/// Outward impulse per unit of player/prop penetration
const PUSH_STIFFNESS: f32 = 4.0;

/// Movable prop owned by a room
#[derive(Debug, Clone)]
pub struct PhysicsObject {
    pub id: u32,
    pub kind: PropKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    /// Radius for barrels, half-size for crates
    pub size: f32,
    pub mass: f32,
    pub destroyed: bool,
}

impl PhysicsObject {
    pub fn new(id: u32, kind: PropKind, x: f32, z: f32) -> Self {
        let (size, mass) = match kind {
            PropKind::Barrel => (0.6, 10.0),
            PropKind::Crate => (0.7, 20.0),
        };
        Self {
            id,
            kind,
            x,
            y: size,
            z,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            size,
            mass,
            destroyed: false,
        }
    }

    /// Resting height of the prop center above the floor
    pub fn ground_height(&self) -> f32 {
        self.size
    }

    fn at_rest(&self) -> bool {
        self.y <= self.ground_height() + REST_EPSILON
            && self.vx.abs() < REST_EPSILON
            && self.vy.abs() < REST_EPSILON
            && self.vz.abs() < REST_EPSILON
    }

    pub fn snapshot(&self) -> PropSnapshot {
        PropSnapshot {
            id: self.id,
            kind: self.kind,
            x: self.x,
            y: self.y,
            z: self.z,
            vx: self.vx,
            vy: self.vy,
            vz: self.vz,
            size: self.size,
        }
    }
}

/// Destructible wall segment owned by a room
#[derive(Debug, Clone)]
pub struct DestructibleWall {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
    pub h: f32,
    pub d: f32,
    pub hp: i32,
    pub destroyed: bool,
}

impl DestructibleWall {
    pub fn new(id: u32, x: f32, z: f32, w: f32, h: f32, d: f32) -> Self {
        Self {
            id,
            x,
            y: h / 2.0,
            z,
            w,
            h,
            d,
            hp: 100,
            destroyed: false,
        }
    }

    pub fn snapshot(&self) -> WallSnapshot {
        WallSnapshot {
            id: self.id,
            x: self.x,
            y: self.y,
            z: self.z,
            w: self.w,
            h: self.h,
            d: self.d,
            hp: self.hp,
        }
    }
}

/// Advance all live props by one fixed step. Returns true if any prop moved.
pub fn step_props(props: &mut [PhysicsObject]) -> bool {
    let dt = TICK_DT;
    let mut moved = false;

    for p in props.iter_mut() {
        if p.destroyed || p.at_rest() {
            continue;
        }

        p.x += p.vx * dt;
        p.y += p.vy * dt;
        p.z += p.vz * dt;
        p.vy -= GRAVITY * dt;

        let floor = p.ground_height();
        if p.y <= floor {
            p.y = floor;
            if p.vy < 0.0 {
                p.vy = -p.vy * RESTITUTION;
                // A bounce slower than the gravity added per tick can never
                // climb back above the floor, so it would cycle forever
                if p.vy < 2.0 * GRAVITY * dt {
                    p.vy = 0.0;
                }
            }
            p.vx *= GROUND_FRICTION;
            p.vz *= GROUND_FRICTION;
        }

        p.vx *= DRAG;
        p.vz *= DRAG;

        if p.vx.abs() < REST_EPSILON {
            p.vx = 0.0;
        }
        if p.vz.abs() < REST_EPSILON {
            p.vz = 0.0;
        }

        moved = true;
    }

    moved
}

/// Outcome of an explosion applied to a prop set
#[derive(Debug, Default)]
pub struct ExplosionOutcome {
    pub any_destroyed: bool,
    pub any_pushed: bool,
}

/// Apply a radial impulse from a blast center, destroying props inside the
/// inner radius and shoving the rest with linear falloff.
pub fn apply_explosion(props: &mut [PhysicsObject], x: f32, y: f32, z: f32) -> ExplosionOutcome {
    let mut outcome = ExplosionOutcome::default();

    for p in props.iter_mut() {
        if p.destroyed {
            continue;
        }

        let dx = p.x - x;
        let dy = p.y - y;
        let dz = p.z - z;
        let dist = (dx * dx + dy * dy + dz * dz).sqrt();

        if dist < BLAST_DESTROY_RADIUS {
            p.destroyed = true;
            outcome.any_destroyed = true;
            continue;
        }
        if dist >= BLAST_RADIUS {
            continue;
        }

        let strength = BLAST_IMPULSE * (1.0 - dist / BLAST_RADIUS);
        let inv = 1.0 / dist.max(0.001);
        p.vx += dx * inv * strength;
        p.vz += dz * inv * strength;
        // Blasts always pop props slightly upward
        p.vy += strength * 0.5;
        outcome.any_pushed = true;
    }

    outcome
}

/// Shove props the player is overlapping, proportional to penetration depth
pub fn push_from_player(props: &mut [PhysicsObject], px: f32, pz: f32) {
    for p in props.iter_mut() {
        if p.destroyed {
            continue;
        }

        let dx = p.x - px;
        let dz = p.z - pz;
        let dist = (dx * dx + dz * dz).sqrt();
        let reach = p.size + PLAYER_RADIUS;
        if dist >= reach {
            continue;
        }

        let overlap = reach - dist;
        let inv = 1.0 / dist.max(0.001);
        p.vx += dx * inv * overlap * PUSH_STIFFNESS;
        p.vz += dz * inv * overlap * PUSH_STIFFNESS;
    }
}

/// Apply a weapon's push impulse to the first prop the shot ray passes near
pub fn push_along_ray(
    props: &mut [PhysicsObject],
    origin: (f32, f32, f32),
    dir: (f32, f32, f32),
    push_force: f32,
    max_range: f32,
) -> bool {
    for p in props.iter_mut() {
        if p.destroyed {
            continue;
        }

        let hit = super::combat::ray_sphere(
            origin.0, origin.1, origin.2, dir.0, dir.1, dir.2, p.x, p.y, p.z, p.size,
        );
        if let Some(t) = hit {
            if t < max_range {
                p.vx += dir.0 * push_force / p.mass * 10.0;
                p.vz += dir.2 * push_force / p.mass * 10.0;
                p.vy += push_force / p.mass;
                return true;
            }
        }
    }
    false
}
