//! Authoritative server state: connection registry, room registry, and the
//! protocol dispatcher. Owned by a single game task; every handler mutates
//! synchronously, which keeps the single-writer-per-room invariant trivial.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::ws::protocol::{
    AchievementId, ClientMsg, GameMode, KillCam, MapId, RoomSummary, ServerMsg, Team, WeaponId,
};

use super::anticheat::{CheatLedger, Verdict};
use super::combat::{self, ShotHit};
use super::economy::{
    self, DEATH_PENALTY, DEMOLITION_COUNT, HEADSHOT_MASTER_COUNT, KILLSTREAK_COUNT, KILL_REWARD,
    RICH_THRESHOLD,
};
use super::hostage;
use super::physics;
use super::room::{Player, Room};
use super::{ClientId, Command, RoomId};

/// Respawn delay: 3 seconds at the 50 ms tick
pub const RESPAWN_DELAY_TICKS: u64 = 60;

/// Wall damage applied when the client omits the amount
pub const DEFAULT_WALL_DAMAGE: i32 = 25;

const MAX_NAME_LEN: usize = 16;
const MAX_CHAT_LEN: usize = 100;

/// Largest impulse a pushObject message may apply per axis
const MAX_OBJECT_PUSH: f32 = 8.0;

/// Read-side mirror of room summaries, shared with the HTTP API
pub struct RoomDirectory {
    rooms: DashMap<RoomId, RoomSummary>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    pub fn list(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self.rooms.iter().map(|r| r.value().clone()).collect();
        rooms.sort_by_key(|r| r.id);
        rooms
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn player_count(&self) -> usize {
        self.rooms.iter().map(|r| r.value().players).sum()
    }

    fn replace_all(&self, summaries: &[RoomSummary]) {
        self.rooms.clear();
        for s in summaries {
            self.rooms.insert(s.id, s.clone());
        }
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Join rejection reasons, surfaced as `joinError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Room is full")]
    RoomFull,
}

/// Identity bound to one live connection
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub room: Option<RoomId>,

    // Lifetime ledger across rooms
    pub kills: u32,
    pub deaths: u32,
    pub headshots: u32,
    pub walls_destroyed: u32,
    pub achievements: HashSet<AchievementId>,

    tx: tokio::sync::mpsc::UnboundedSender<ServerMsg>,
    cheat: CheatLedger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    Respawn,
}

/// Cancellable deferred effect, keyed by (room, player, kind). Dropped
/// silently when the room or player no longer exists at fire time.
#[derive(Debug)]
struct ScheduledTask {
    due_tick: u64,
    room: RoomId,
    player: ClientId,
    kind: TaskKind,
}

/// The whole server state, owned by the game task
pub struct World {
    clients: HashMap<ClientId, Client>,
    rooms: std::collections::BTreeMap<RoomId, Room>,
    next_room_id: RoomId,
    tick: u64,
    tasks: Vec<ScheduledTask>,
    directory: Arc<RoomDirectory>,
    anticheat: bool,
}

impl World {
    pub fn new(directory: Arc<RoomDirectory>, anticheat: bool) -> Self {
        Self {
            clients: HashMap::new(),
            rooms: std::collections::BTreeMap::new(),
            next_room_id: 1,
            tick: 0,
            tasks: Vec::new(),
            directory,
            anticheat,
        }
    }

    pub fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { id, tx } => self.connect(id, tx),
            Command::Message { id, msg } => self.handle_message(id, msg),
            Command::Disconnect { id } => self.disconnect(id),
        }
    }

    pub fn connect(&mut self, id: ClientId, tx: tokio::sync::mpsc::UnboundedSender<ServerMsg>) {
        let client = Client {
            id,
            name: format!("Player {id}"),
            room: None,
            kills: 0,
            deaths: 0,
            headshots: 0,
            walls_destroyed: 0,
            achievements: HashSet::new(),
            tx,
            cheat: CheatLedger::new(),
        };
        let _ = client.tx.send(ServerMsg::Welcome {
            id,
            achievements: Vec::new(),
            weapon_prices: economy::weapon_catalog(),
        });
        let _ = client.tx.send(ServerMsg::RoomList {
            rooms: self.directory.list(),
        });
        self.clients.insert(id, client);
        info!(client_id = id, total = self.clients.len(), "Client connected");
    }

    pub fn disconnect(&mut self, id: ClientId) {
        self.leave_room(id);
        if self.clients.remove(&id).is_some() {
            info!(client_id = id, total = self.clients.len(), "Client disconnected");
        }
    }

    /// Protocol dispatcher: one inbound message, one synchronous mutation
    pub fn handle_message(&mut self, id: ClientId, msg: ClientMsg) {
        if !self.clients.contains_key(&id) {
            return;
        }
        match msg {
            ClientMsg::GetRooms => self.send_room_list(id),
            ClientMsg::CreateRoom {
                name,
                password,
                map,
                mode,
            } => self.create_room(id, name, password, map, mode),
            ClientMsg::JoinRoom { room_id, password } => self.join_room(id, room_id, password),
            ClientMsg::LeaveRoom => self.leave_room(id),
            ClientMsg::SetName { name } => self.set_name(id, name),
            ClientMsg::Move { x, y, z, rx, ry } => self.handle_move(id, x, y, z, rx, ry),
            ClientMsg::Shoot {
                x,
                y,
                z,
                dx,
                dy,
                dz,
                weapon,
            } => self.handle_shoot(id, (x, y, z), (dx, dy, dz), weapon),
            ClientMsg::SwitchWeapon { weapon } => self.switch_weapon(id, weapon),
            ClientMsg::BuyWeapon { weapon } => self.buy_weapon(id, weapon),
            ClientMsg::Chat { msg } => self.chat(id, msg),
            ClientMsg::RpgExplode { x, y, z } => self.rpg_explode(id, x, y, z),
            ClientMsg::DestroyWall { wall_id, damage } => self.destroy_wall(id, wall_id, damage),
            ClientMsg::PushObject { obj_id, dx, dz } => self.push_object(id, obj_id, dx, dz),
            ClientMsg::RescueHostage { hostage_id } => self.rescue_hostage(id, hostage_id),
        }
    }

    // ------------------------------------------------------------------
    // Room lifecycle
    // ------------------------------------------------------------------

    fn send_room_list(&self, id: ClientId) {
        let rooms = self.rooms.values().map(Room::summary).collect();
        send(&self.clients, id, ServerMsg::RoomList { rooms });
    }

    fn create_room(
        &mut self,
        id: ClientId,
        name: String,
        password: Option<String>,
        map: MapId,
        mode: GameMode,
    ) {
        self.leave_room(id);

        let room_id = self.next_room_id;
        self.next_room_id += 1;
        let name: String = name.chars().take(32).collect();
        let password = password.filter(|p| !p.is_empty());
        let room = Room::new(room_id, name, password, map, mode, rand::random());
        self.rooms.insert(room_id, room);

        info!(client_id = id, room_id, ?map, ?mode, "Room created");

        // Auto-join; the password is known to match and the room is empty
        if let Err(e) = self.try_join(id, room_id) {
            send(
                &self.clients,
                id,
                ServerMsg::JoinError {
                    error: e.to_string(),
                },
            );
        }
    }

    fn join_room(&mut self, id: ClientId, room_id: RoomId, password: Option<String>) {
        // Validate before leaving the current room, so a failed join does not
        // dump the player into the lobby
        let check = match self.rooms.get(&room_id) {
            None => Err(JoinError::RoomNotFound),
            Some(room) if !room.password_matches(password.as_deref()) => {
                Err(JoinError::WrongPassword)
            }
            Some(room) if room.is_full() => Err(JoinError::RoomFull),
            Some(_) => Ok(()),
        };

        let result = check.and_then(|()| {
            self.leave_room(id);
            self.try_join(id, room_id)
        });

        if let Err(e) = result {
            debug!(client_id = id, room_id, error = %e, "Join rejected");
            send(
                &self.clients,
                id,
                ServerMsg::JoinError {
                    error: e.to_string(),
                },
            );
        }
    }

    fn try_join(&mut self, id: ClientId, room_id: RoomId) -> Result<(), JoinError> {
        let name = match self.clients.get(&id) {
            Some(c) => c.name.clone(),
            None => return Ok(()),
        };

        {
            let room = self.rooms.get_mut(&room_id).ok_or(JoinError::RoomNotFound)?;
            if room.is_full() {
                return Err(JoinError::RoomFull);
            }

            let team = room.pick_team();
            let sp = room.join_spawn(team);
            let player = Player::new(id, name, team, sp.x, sp.y, sp.z);
            let join_msg = ServerMsg::PlayerJoin {
                player: player.snapshot(),
            };
            room.players.insert(id, player);

            if let Some(new_size) = room.resize_for_population() {
                let resize = ServerMsg::MapResize {
                    size: new_size,
                    physics_objects: room.live_prop_snapshots(),
                    destructible_walls: room.wall_snapshots(),
                };
                broadcast(&self.clients, room, &resize, Some(id));
            }
            broadcast(&self.clients, room, &join_msg, Some(id));

            let joined = ServerMsg::JoinedRoom {
                id: room.id,
                name: room.name.clone(),
                map: room.map,
                mode: room.mode,
                size: room.size,
                self_id: id,
                players: room.player_snapshots(),
                physics_objects: room.live_prop_snapshots(),
                destructible_walls: room.wall_snapshots(),
                hostages: room.hostage_snapshots(),
                scores: room.scores,
            };
            send(&self.clients, id, joined);

            info!(client_id = id, room_id, players = room.players.len(), "Player joined room");
        }

        if let Some(c) = self.clients.get_mut(&id) {
            c.room = Some(room_id);
            c.cheat.reset_position();
        }
        self.publish_rooms();
        Ok(())
    }

    /// Idempotent: a client outside any room is a no-op
    fn leave_room(&mut self, id: ClientId) {
        let Some(room_id) = self.clients.get(&id).and_then(|c| c.room) else {
            return;
        };

        let mut empty = false;
        if let Some(room) = self.rooms.get_mut(&room_id) {
            if let Some(hid) = room.release_hostage_of(id) {
                broadcast(
                    &self.clients,
                    room,
                    &ServerMsg::HostageFollow {
                        hostage_id: hid,
                        player_id: None,
                    },
                    None,
                );
            }

            room.players.remove(&id);
            broadcast(&self.clients, room, &ServerMsg::PlayerLeave { id }, None);

            empty = room.players.is_empty();
            if !empty {
                if let Some(new_size) = room.resize_for_population() {
                    let resize = ServerMsg::MapResize {
                        size: new_size,
                        physics_objects: room.live_prop_snapshots(),
                        destructible_walls: room.wall_snapshots(),
                    };
                    broadcast(&self.clients, room, &resize, None);
                }
            }
        }

        if empty {
            self.rooms.remove(&room_id);
            info!(room_id, "Room removed (empty)");
        }

        // Ids are reused across join cycles, so a timer left behind here
        // would fire against a future avatar with the same keys
        self.tasks
            .retain(|t| t.player != id && (!empty || t.room != room_id));

        if let Some(c) = self.clients.get_mut(&id) {
            c.room = None;
        }
        self.publish_rooms();
    }

    /// Republish room summaries to the HTTP directory and lobby clients
    fn publish_rooms(&mut self) {
        let summaries: Vec<RoomSummary> = self.rooms.values().map(Room::summary).collect();
        self.directory.replace_all(&summaries);
        broadcast_lobby(&self.clients, &ServerMsg::RoomList { rooms: summaries });
    }

    // ------------------------------------------------------------------
    // Identity and chat
    // ------------------------------------------------------------------

    fn set_name(&mut self, id: ClientId, name: String) {
        let trimmed: String = name.trim().chars().take(MAX_NAME_LEN).collect();
        let name = if trimmed.is_empty() {
            format!("Player {id}")
        } else {
            trimmed
        };

        let room_id = match self.clients.get_mut(&id) {
            Some(c) => {
                c.name = name.clone();
                c.room
            }
            None => return,
        };

        if let Some(room_id) = room_id {
            if let Some(room) = self.rooms.get_mut(&room_id) {
                if let Some(p) = room.players.get_mut(&id) {
                    p.name = name.clone();
                }
                broadcast(
                    &self.clients,
                    room,
                    &ServerMsg::NameChange { id, name },
                    None,
                );
            }
        }
    }

    fn chat(&mut self, id: ClientId, msg: String) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        let Some(room_id) = client.room else {
            debug!(client_id = id, "Chat outside a room ignored");
            return;
        };
        let name = client.name.clone();
        let msg: String = msg.chars().take(MAX_CHAT_LEN).collect();

        if let Some(room) = self.rooms.get(&room_id) {
            broadcast(&self.clients, room, &ServerMsg::Chat { id, name, msg }, None);
        }
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    fn handle_move(&mut self, id: ClientId, x: f32, y: f32, z: f32, rx: f32, ry: f32) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        let Some(room_id) = client.room else {
            return;
        };

        if self.anticheat {
            match client.cheat.check_move(x, y, z) {
                Verdict::Ok => {}
                Verdict::Drop => {
                    warn!(client_id = id, "Move rejected by speed check");
                    return;
                }
                Verdict::Kick => {
                    self.kick(id, "movement violations");
                    return;
                }
            }
        }

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        let Some(p) = room.players.get_mut(&id) else {
            return;
        };
        if !p.alive {
            return;
        }

        p.x = x;
        p.y = y;
        p.z = z;
        p.rx = rx;
        p.ry = ry;
        p.moving = true;

        physics::push_from_player(&mut room.props, x, z);

        broadcast(
            &self.clients,
            room,
            &ServerMsg::PlayerMove { id, x, y, z, rx, ry },
            Some(id),
        );
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    fn handle_shoot(
        &mut self,
        id: ClientId,
        origin: (f32, f32, f32),
        dir: (f32, f32, f32),
        weapon: WeaponId,
    ) {
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        let Some(room_id) = client.room else {
            return;
        };

        if self.anticheat {
            match client.cheat.check_shot(weapon, Instant::now()) {
                Verdict::Ok => {}
                Verdict::Drop => {
                    warn!(client_id = id, ?weapon, "Shot rejected by fire-rate check");
                    return;
                }
                Verdict::Kick => {
                    self.kick(id, "fire-rate violations");
                    return;
                }
            }
        }

        let mut lethal: Option<ShotHit> = None;
        {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                return;
            };
            let Some(shooter) = room.players.get(&id) else {
                return;
            };
            if !shooter.alive {
                return;
            }
            let team = shooter.team;

            broadcast(
                &self.clients,
                room,
                &ServerMsg::PlayerShoot {
                    id,
                    x: origin.0,
                    y: origin.1,
                    z: origin.2,
                    dx: dir.0,
                    dy: dir.1,
                    dz: dir.2,
                    weapon,
                },
                Some(id),
            );

            if let Some(hit) =
                combat::resolve_shot(id, team, origin, dir, weapon, room.mode, &room.players)
            {
                let mut new_hp = 0;
                if let Some(target) = room.players.get_mut(&hit.target) {
                    target.hp -= hit.damage;
                    new_hp = target.hp;
                }

                if new_hp <= 0 {
                    lethal = Some(hit);
                } else {
                    send(
                        &self.clients,
                        hit.target,
                        ServerMsg::Hit {
                            hp: new_hp,
                            attacker_id: id,
                        },
                    );
                    send(
                        &self.clients,
                        id,
                        ServerMsg::HitConfirm {
                            target_id: hit.target,
                            hp: new_hp,
                            headshot: hit.headshot,
                        },
                    );
                }
            }

            if weapon.pushes_props() {
                physics::push_along_ray(
                    &mut room.props,
                    origin,
                    dir,
                    weapon.spec().push_force,
                    combat::MAX_PUSH_RANGE,
                );
            }
        }

        if let Some(hit) = lethal {
            self.resolve_kill(room_id, id, hit.target, weapon, hit.headshot);
        }
    }

    fn resolve_kill(
        &mut self,
        room_id: RoomId,
        killer_id: ClientId,
        victim_id: ClientId,
        weapon: WeaponId,
        headshot: bool,
    ) {
        let mut killer_money = 0;
        let mut killer_streak = 0;
        let mut first_blood = false;
        {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                return;
            };

            let (victim_pos, victim_money) = match room.players.get_mut(&victim_id) {
                Some(victim) => {
                    victim.hp = 0;
                    victim.alive = false;
                    victim.deaths += 1;
                    victim.streak = 0;
                    victim.money = (victim.money - DEATH_PENALTY).max(0);
                    ((victim.x, victim.y, victim.z), victim.money)
                }
                None => return,
            };

            let (killer_name, killer_pos, killer_team) = match room.players.get_mut(&killer_id) {
                Some(killer) => {
                    killer.kills += 1;
                    killer.streak += 1;
                    killer.money += KILL_REWARD;
                    killer_money = killer.money;
                    killer_streak = killer.streak;
                    (
                        killer.name.clone(),
                        (killer.x, killer.y, killer.z),
                        killer.team,
                    )
                }
                None => return,
            };

            if room.mode == GameMode::Deathmatch {
                match killer_team {
                    Team::T => room.scores.t += 1,
                    Team::Ct => room.scores.ct += 1,
                }
            }
            if !room.first_blood_taken {
                room.first_blood_taken = true;
                first_blood = true;
            }

            if let Some(hid) = room.release_hostage_of(victim_id) {
                broadcast(
                    &self.clients,
                    room,
                    &ServerMsg::HostageFollow {
                        hostage_id: hid,
                        player_id: None,
                    },
                    None,
                );
            }

            let kill_cam = KillCam {
                killer_name,
                killer_x: killer_pos.0,
                killer_y: killer_pos.1,
                killer_z: killer_pos.2,
                victim_x: victim_pos.0,
                victim_y: victim_pos.1,
                victim_z: victim_pos.2,
                weapon,
                headshot,
            };
            broadcast(
                &self.clients,
                room,
                &ServerMsg::Kill {
                    killer_id,
                    victim_id,
                    weapon,
                    headshot,
                    kill_cam,
                    killer_money,
                    victim_money,
                },
                None,
            );

            info!(
                room_id,
                killer_id, victim_id, ?weapon, headshot, "Kill resolved"
            );
        }

        self.tasks.push(ScheduledTask {
            due_tick: self.tick + RESPAWN_DELAY_TICKS,
            room: room_id,
            player: victim_id,
            kind: TaskKind::Respawn,
        });

        // Lifetime ledgers and achievement triggers
        let mut unlocked = Vec::new();
        if let Some(c) = self.clients.get_mut(&killer_id) {
            c.kills += 1;
            if headshot {
                c.headshots += 1;
            }
            let mut check = |cond: bool, set: &mut HashSet<AchievementId>, id: AchievementId| {
                if cond && economy::unlock(set, id) {
                    unlocked.push(id);
                }
            };
            check(first_blood, &mut c.achievements, AchievementId::FirstBlood);
            check(
                weapon == WeaponId::Knife,
                &mut c.achievements,
                AchievementId::KnifeKill,
            );
            check(
                c.headshots >= HEADSHOT_MASTER_COUNT,
                &mut c.achievements,
                AchievementId::HeadshotMaster,
            );
            check(
                killer_streak >= KILLSTREAK_COUNT,
                &mut c.achievements,
                AchievementId::Killstreak5,
            );
            check(
                killer_money >= RICH_THRESHOLD,
                &mut c.achievements,
                AchievementId::Rich,
            );
        }
        if let Some(c) = self.clients.get_mut(&victim_id) {
            c.deaths += 1;
        }
        if !unlocked.is_empty() {
            send(
                &self.clients,
                killer_id,
                ServerMsg::NewAchievements {
                    achievements: unlocked,
                },
            );
        }
    }

    fn rpg_explode(&mut self, id: ClientId, x: f32, y: f32, z: f32) {
        let Some(room_id) = self.clients.get(&id).and_then(|c| c.room) else {
            return;
        };

        let mut kills = Vec::new();
        {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                return;
            };
            let Some(shooter) = room.players.get(&id) else {
                return;
            };
            if !shooter.alive {
                return;
            }
            let team = shooter.team;
            let mode = room.mode;

            broadcast(
                &self.clients,
                room,
                &ServerMsg::Explosion {
                    x,
                    y,
                    z,
                    radius: physics::BLAST_RADIUS,
                },
                None,
            );

            let outcome = physics::apply_explosion(&mut room.props, x, y, z);
            if outcome.any_destroyed || outcome.any_pushed {
                broadcast(
                    &self.clients,
                    room,
                    &ServerMsg::PhysicsUpdate {
                        objects: room.live_prop_snapshots(),
                    },
                    None,
                );
            }

            let mut damaged = Vec::new();
            for (&pid, p) in room.players.iter_mut() {
                if pid == id || !p.alive {
                    continue;
                }
                if mode != GameMode::Ffa && p.team == team {
                    continue;
                }
                let dx = p.x - x;
                let dy = p.y - y;
                let dz = p.z - z;
                let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                let dmg =
                    combat::explosion_damage(combat::RPG_BASE_DAMAGE, dist, physics::BLAST_RADIUS);
                if dmg <= 0 {
                    continue;
                }
                p.hp -= dmg;
                damaged.push((pid, p.hp));
            }

            for (pid, hp) in damaged {
                if hp <= 0 {
                    kills.push(pid);
                } else {
                    send(
                        &self.clients,
                        pid,
                        ServerMsg::Hit {
                            hp,
                            attacker_id: id,
                        },
                    );
                    send(
                        &self.clients,
                        id,
                        ServerMsg::HitConfirm {
                            target_id: pid,
                            hp,
                            headshot: false,
                        },
                    );
                }
            }
        }

        for pid in kills {
            self.resolve_kill(room_id, id, pid, WeaponId::Rpg, false);
        }
    }

    // ------------------------------------------------------------------
    // Walls and props
    // ------------------------------------------------------------------

    fn destroy_wall(&mut self, id: ClientId, wall_id: u32, damage: Option<i32>) {
        let Some(room_id) = self.clients.get(&id).and_then(|c| c.room) else {
            return;
        };

        let mut destroyed = false;
        {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                return;
            };
            if !room.players.contains_key(&id) {
                return;
            }
            let Some(wall) = room.walls.iter_mut().find(|w| w.id == wall_id) else {
                return;
            };
            // Idempotent: destroyed walls take no further damage or events
            if wall.destroyed {
                return;
            }

            let amount = damage.unwrap_or(DEFAULT_WALL_DAMAGE).max(0);
            wall.hp -= amount;
            let msg = if wall.hp <= 0 {
                wall.hp = 0;
                wall.destroyed = true;
                destroyed = true;
                ServerMsg::WallDestroyed { wall_id, by: id }
            } else {
                ServerMsg::WallDamaged {
                    wall_id,
                    hp: wall.hp,
                }
            };
            broadcast(&self.clients, room, &msg, None);
        }

        if destroyed {
            let mut unlocked = Vec::new();
            if let Some(c) = self.clients.get_mut(&id) {
                c.walls_destroyed += 1;
                if c.walls_destroyed >= DEMOLITION_COUNT
                    && economy::unlock(&mut c.achievements, AchievementId::DemolitionMan)
                {
                    unlocked.push(AchievementId::DemolitionMan);
                }
            }
            if !unlocked.is_empty() {
                send(
                    &self.clients,
                    id,
                    ServerMsg::NewAchievements {
                        achievements: unlocked,
                    },
                );
            }
        }
    }

    fn push_object(&mut self, id: ClientId, obj_id: u32, dx: f32, dz: f32) {
        let Some(room_id) = self.clients.get(&id).and_then(|c| c.room) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        if !room.players.get(&id).map(|p| p.alive).unwrap_or(false) {
            return;
        }
        if let Some(p) = room
            .props
            .iter_mut()
            .find(|p| p.id == obj_id && !p.destroyed)
        {
            p.vx += dx.clamp(-MAX_OBJECT_PUSH, MAX_OBJECT_PUSH);
            p.vz += dz.clamp(-MAX_OBJECT_PUSH, MAX_OBJECT_PUSH);
        }
    }

    // ------------------------------------------------------------------
    // Economy
    // ------------------------------------------------------------------

    fn buy_weapon(&mut self, id: ClientId, weapon: WeaponId) {
        let Some(room_id) = self.clients.get(&id).and_then(|c| c.room) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };

        let in_zone = room
            .players
            .get(&id)
            .map(|p| room.in_buy_zone(p))
            .unwrap_or(false);
        let Some(p) = room.players.get_mut(&id) else {
            return;
        };
        if !p.alive {
            return;
        }

        match economy::try_buy(p, weapon, in_zone) {
            Ok(()) => {
                let money = p.money;
                send(&self.clients, id, ServerMsg::WeaponBought { weapon, money });
                broadcast(
                    &self.clients,
                    room,
                    &ServerMsg::WeaponSwitch { id, weapon },
                    Some(id),
                );
            }
            Err(e) => {
                send(
                    &self.clients,
                    id,
                    ServerMsg::BuyError {
                        error: e.to_string(),
                    },
                );
            }
        }
    }

    fn switch_weapon(&mut self, id: ClientId, weapon: WeaponId) {
        let Some(room_id) = self.clients.get(&id).and_then(|c| c.room) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        let Some(p) = room.players.get_mut(&id) else {
            return;
        };

        match economy::try_switch(p, weapon) {
            Ok(()) => {
                broadcast(
                    &self.clients,
                    room,
                    &ServerMsg::WeaponSwitch { id, weapon },
                    Some(id),
                );
            }
            Err(e) => {
                send(
                    &self.clients,
                    id,
                    ServerMsg::SwitchError {
                        error: e.to_string(),
                    },
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Hostages
    // ------------------------------------------------------------------

    fn rescue_hostage(&mut self, id: ClientId, hostage_id: u32) {
        let Some(room_id) = self.clients.get(&id).and_then(|c| c.room) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        if room.mode != GameMode::Hostage {
            return;
        }
        let Some(player) = room.players.get(&id) else {
            return;
        };

        if hostage::try_pickup(&mut room.hostages, player, hostage_id) {
            broadcast(
                &self.clients,
                room,
                &ServerMsg::HostageFollow {
                    hostage_id,
                    player_id: Some(id),
                },
                None,
            );
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// One fixed 50 ms step: physics, hostage following, state snapshots,
    /// and due scheduled tasks.
    pub fn tick(&mut self) {
        self.tick += 1;

        for room in self.rooms.values_mut() {
            if physics::step_props(&mut room.props) {
                broadcast(
                    &self.clients,
                    room,
                    &ServerMsg::PhysicsUpdate {
                        objects: room.live_prop_snapshots(),
                    },
                    None,
                );
            }

            if room.mode == GameMode::Hostage {
                let zone = room.map.config().rescue_zone;
                let rescued = hostage::advance(&mut room.hostages, &room.players, zone);
                for (hid, carrier) in rescued {
                    room.scores.ct += 1;
                    broadcast(
                        &self.clients,
                        room,
                        &ServerMsg::HostageRescued {
                            hostage_id: hid,
                            by: carrier,
                        },
                        None,
                    );
                    info!(room_id = room.id, hostage_id = hid, by = carrier, "Hostage rescued");
                }
            }

            if !room.players.is_empty() {
                let snapshot = ServerMsg::State {
                    players: room.player_snapshots(),
                    scores: room.scores,
                    hostages: (room.mode == GameMode::Hostage)
                        .then(|| room.hostage_snapshots()),
                };
                broadcast(&self.clients, room, &snapshot, None);
            }

            for p in room.players.values_mut() {
                p.moving = false;
            }
        }

        let now = self.tick;
        let tasks = std::mem::take(&mut self.tasks);
        let (due, pending): (Vec<_>, Vec<_>) = tasks.into_iter().partition(|t| t.due_tick <= now);
        self.tasks = pending;
        for task in due {
            match task.kind {
                TaskKind::Respawn => self.fire_respawn(task.room, task.player),
            }
        }
    }

    /// No-op when the room or player is gone by the time the timer fires
    fn fire_respawn(&mut self, room_id: RoomId, player_id: ClientId) {
        {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                return;
            };
            let team = match room.players.get(&player_id) {
                Some(p) => p.team,
                None => return,
            };
            let sp = room.random_spawn(team);
            let Some(p) = room.players.get_mut(&player_id) else {
                return;
            };

            p.hp = 100;
            p.alive = true;
            p.x = sp.x;
            p.y = sp.y;
            p.z = sp.z;
            p.weapon = WeaponId::Knife;
            p.owned = HashSet::from([WeaponId::Knife]);
            p.streak = 0;
            let money = p.money;

            broadcast(
                &self.clients,
                room,
                &ServerMsg::Respawn {
                    id: player_id,
                    x: sp.x,
                    y: sp.y,
                    z: sp.z,
                    money,
                },
                None,
            );
        }

        if let Some(c) = self.clients.get_mut(&player_id) {
            c.cheat.reset_position();
        }
    }

    fn kick(&mut self, id: ClientId, reason: &str) {
        warn!(client_id = id, reason, "Kicking client");
        send(
            &self.clients,
            id,
            ServerMsg::Kicked {
                reason: reason.to_string(),
            },
        );
        // Dropping the client entry closes its outbound channel, which ends
        // the session task and the socket
        self.disconnect(id);
    }

    #[cfg(test)]
    fn room(&self, id: RoomId) -> &Room {
        self.rooms.get(&id).expect("room missing")
    }

    #[cfg(test)]
    fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

fn send(clients: &HashMap<ClientId, Client>, id: ClientId, msg: ServerMsg) {
    if let Some(c) = clients.get(&id) {
        let _ = c.tx.send(msg);
    }
}

fn broadcast(
    clients: &HashMap<ClientId, Client>,
    room: &Room,
    msg: &ServerMsg,
    exclude: Option<ClientId>,
) {
    for &pid in room.players.keys() {
        if Some(pid) == exclude {
            continue;
        }
        send(clients, pid, msg.clone());
    }
}

/// Room list updates go to clients not currently in any room
fn broadcast_lobby(clients: &HashMap<ClientId, Client>, msg: &ServerMsg) {
    for c in clients.values() {
        if c.room.is_none() {
            let _ = c.tx.send(msg.clone());
        }
    }
}
