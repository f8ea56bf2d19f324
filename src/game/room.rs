//! Room state: one isolated match instance and its player avatars

use std::collections::{BTreeMap, HashSet};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::ws::protocol::{GameMode, MapId, PlayerSnapshot, RoomSummary, Scores, Team, WeaponId};

use super::economy::START_MONEY;
use super::hostage::{self, Hostage};
use super::map::{self, SpawnPoint};
use super::physics::{DestructibleWall, PhysicsObject};
use super::{ClientId, RoomId};

/// Room capacity
pub const MAX_PLAYERS: usize = 10;

/// A client's in-match avatar, owned exclusively by its room
#[derive(Debug, Clone)]
pub struct Player {
    pub id: ClientId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rx: f32,
    pub ry: f32,
    pub hp: i32,
    pub money: i32,
    pub team: Team,
    pub alive: bool,
    pub weapon: WeaponId,
    pub owned: HashSet<WeaponId>,
    pub kills: u32,
    pub deaths: u32,
    pub streak: u32,
    pub moving: bool,
}

impl Player {
    pub fn new(id: ClientId, name: String, team: Team, x: f32, y: f32, z: f32) -> Self {
        Self {
            id,
            name,
            x,
            y,
            z,
            rx: 0.0,
            ry: 0.0,
            hp: 100,
            money: START_MONEY,
            team,
            alive: true,
            weapon: WeaponId::Knife,
            owned: HashSet::from([WeaponId::Knife]),
            kills: 0,
            deaths: 0,
            streak: 0,
            moving: false,
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            x: self.x,
            y: self.y,
            z: self.z,
            rx: self.rx,
            ry: self.ry,
            hp: self.hp,
            money: self.money,
            team: self.team,
            alive: self.alive,
            weapon: self.weapon,
            kills: self.kills,
            deaths: self.deaths,
            moving: self.moving,
        }
    }
}

/// One match instance. BTreeMap keeps player iteration in ascending id
/// order, which the combat resolver relies on for deterministic hits.
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub password: Option<String>,
    pub map: MapId,
    pub mode: GameMode,
    pub max_players: usize,
    pub size: f32,
    pub players: BTreeMap<ClientId, Player>,
    pub props: Vec<PhysicsObject>,
    pub walls: Vec<DestructibleWall>,
    pub hostages: Vec<Hostage>,
    pub scores: Scores,
    pub first_blood_taken: bool,
    pub rng: ChaCha8Rng,
}

impl Room {
    pub fn new(
        id: RoomId,
        name: String,
        password: Option<String>,
        map: MapId,
        mode: GameMode,
        seed: u64,
    ) -> Self {
        let cfg = map.config();
        let size = cfg.size_for(0);
        let hostages = if mode == GameMode::Hostage {
            map::generate_hostages(map)
        } else {
            Vec::new()
        };

        Self {
            id,
            name,
            password,
            map,
            mode,
            max_players: MAX_PLAYERS,
            size,
            players: BTreeMap::new(),
            props: map::generate_props(map, size),
            walls: map::generate_walls(map, size),
            hostages,
            scores: Scores::default(),
            first_blood_taken: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn password_matches(&self, supplied: Option<&str>) -> bool {
        match &self.password {
            None => true,
            Some(expected) => supplied == Some(expected.as_str()),
        }
    }

    pub fn team_count(&self, team: Team) -> usize {
        self.players.values().filter(|p| p.team == team).count()
    }

    /// Next join goes to the less-populated team; ties go to T
    pub fn pick_team(&self) -> Team {
        if self.team_count(Team::Ct) < self.team_count(Team::T) {
            Team::Ct
        } else {
            Team::T
        }
    }

    /// Round-robin spawn for a joining player: players already on the team
    /// modulo the spawn list length
    pub fn join_spawn(&self, team: Team) -> SpawnPoint {
        let spawns = self.map.config().spawns(team);
        spawns[self.team_count(team) % spawns.len()]
    }

    /// Random spawn from the team's list, used for respawns
    pub fn random_spawn(&mut self, team: Team) -> SpawnPoint {
        let spawns = self.map.config().spawns(team);
        spawns[self.rng.gen_range(0..spawns.len())]
    }

    /// Recompute the arena size from population. On change, regenerates the
    /// wall ring and prop layout and returns the new size. Fixed maps and
    /// no-op size changes return None.
    pub fn resize_for_population(&mut self) -> Option<f32> {
        let cfg = self.map.config();
        if cfg.expand_per_player == 0.0 {
            return None;
        }
        let new_size = cfg.size_for(self.players.len());
        if new_size == self.size {
            return None;
        }

        self.size = new_size;
        self.props = map::generate_props(self.map, new_size);
        self.walls = map::generate_walls(self.map, new_size);
        Some(new_size)
    }

    pub fn in_buy_zone(&self, player: &Player) -> bool {
        self.map
            .config()
            .buy_zone(player.team)
            .contains_xz(player.x, player.z)
    }

    /// Release any hostage the player was carrying
    pub fn release_hostage_of(&mut self, player_id: ClientId) -> Option<u32> {
        hostage::release_carrier(&mut self.hostages, player_id)
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id,
            name: self.name.clone(),
            map: self.map,
            mode: self.mode,
            players: self.players.len(),
            max_players: self.max_players,
            has_password: self.password.is_some(),
        }
    }

    pub fn player_snapshots(&self) -> Vec<PlayerSnapshot> {
        self.players.values().map(Player::snapshot).collect()
    }

    /// Non-destroyed props for physics broadcasts
    pub fn live_prop_snapshots(&self) -> Vec<crate::ws::protocol::PropSnapshot> {
        self.props
            .iter()
            .filter(|p| !p.destroyed)
            .map(PhysicsObject::snapshot)
            .collect()
    }

    pub fn wall_snapshots(&self) -> Vec<crate::ws::protocol::WallSnapshot> {
        self.walls
            .iter()
            .filter(|w| !w.destroyed)
            .map(DestructibleWall::snapshot)
            .collect()
    }

    pub fn hostage_snapshots(&self) -> Vec<crate::ws::protocol::HostageSnapshot> {
        self.hostages.iter().map(Hostage::snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(map: MapId, mode: GameMode) -> Room {
        Room::new(1, "test".to_string(), None, map, mode, 7)
    }

    fn join(room: &mut Room, id: ClientId) -> Team {
        let team = room.pick_team();
        let sp = room.join_spawn(team);
        room.players
            .insert(id, Player::new(id, format!("p{id}"), team, sp.x, sp.y, sp.z));
        team
    }

    #[test]
    fn join_keeps_teams_balanced() {
        let mut r = room(MapId::Dust, GameMode::Deathmatch);
        for id in 1..=9 {
            join(&mut r, id);
            let t = r.team_count(Team::T) as i32;
            let ct = r.team_count(Team::Ct) as i32;
            assert!((t - ct).abs() <= 1, "unbalanced after join {id}");
        }
    }

    #[test]
    fn join_spawns_round_robin_per_team() {
        let mut r = room(MapId::Dust, GameMode::Deathmatch);
        let spawns = MapId::Dust.config().t_spawns;

        // First T player gets spawn index 0, second index 1
        let t1 = join(&mut r, 1);
        assert_eq!(t1, Team::T);
        let p1 = r.players.get(&1).unwrap();
        assert_eq!((p1.x, p1.z), (spawns[0].x, spawns[0].z));

        join(&mut r, 2); // CT
        let t3 = join(&mut r, 3);
        assert_eq!(t3, Team::T);
        // join_spawn was computed before insert, with one T already present
        let p3 = r.players.get(&3).unwrap();
        assert_eq!((p3.x, p3.z), (spawns[1].x, spawns[1].z));
    }

    #[test]
    fn respawn_point_comes_from_the_team_list() {
        let mut r = room(MapId::Dust, GameMode::Deathmatch);
        for _ in 0..20 {
            let sp = r.random_spawn(Team::Ct);
            assert!(MapId::Dust
                .config()
                .ct_spawns
                .iter()
                .any(|s| s.x == sp.x && s.z == sp.z));
        }
    }

    #[test]
    fn arena_resizes_only_on_actual_change() {
        let mut r = room(MapId::Arena, GameMode::Deathmatch);
        assert_eq!(r.size, 30.0);
        let walls_before = r.walls.len();

        join(&mut r, 1);
        assert_eq!(r.resize_for_population(), Some(35.0));
        assert_eq!(r.resize_for_population(), None, "no-op resize skipped");
        assert!(r.walls.len() >= walls_before);

        // Fixed map never resizes
        let mut fixed = room(MapId::Dust, GameMode::Deathmatch);
        join(&mut fixed, 1);
        assert_eq!(fixed.resize_for_population(), None);
    }

    #[test]
    fn hostages_exist_only_in_hostage_mode() {
        assert!(room(MapId::Dust, GameMode::Deathmatch).hostages.is_empty());
        assert!(!room(MapId::Dust, GameMode::Hostage).hostages.is_empty());
    }

    #[test]
    fn password_check() {
        let mut r = room(MapId::Dust, GameMode::Deathmatch);
        assert!(r.password_matches(None));
        r.password = Some("sekrit".to_string());
        assert!(!r.password_matches(None));
        assert!(!r.password_matches(Some("wrong")));
        assert!(r.password_matches(Some("sekrit")));
    }
}
