//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::{ClientId, RoomId};

/// Team assignment inside a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Team {
    T,
    Ct,
}

/// Match mode of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Deathmatch,
    Hostage,
    Ffa,
}

/// Map identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapId {
    Dust,
    Arena,
    Warehouse,
}

/// Weapon identifier (wire name matches the client catalog)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponId {
    Knife,
    Deagle,
    Ak47,
    Awp,
    Rpg,
}

/// Achievement identifiers unlocked per connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstBlood,
    KnifeKill,
    HeadshotMaster,
    Killstreak5,
    DemolitionMan,
    Rich,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Request the current room list
    GetRooms,

    /// Create a room and auto-join it
    CreateRoom {
        name: String,
        password: Option<String>,
        map: MapId,
        mode: GameMode,
    },

    /// Join an existing room
    JoinRoom {
        room_id: RoomId,
        password: Option<String>,
    },

    /// Leave the current room (no-op outside a room)
    LeaveRoom,

    /// Set display name (truncated to 16 chars)
    SetName { name: String },

    /// Position and aim update
    Move { x: f32, y: f32, z: f32, rx: f32, ry: f32 },

    /// Fire a hitscan ray from (x,y,z) along (dx,dy,dz)
    Shoot {
        x: f32,
        y: f32,
        z: f32,
        dx: f32,
        dy: f32,
        dz: f32,
        weapon: WeaponId,
    },

    /// Equip an owned weapon
    SwitchWeapon { weapon: WeaponId },

    /// Purchase a weapon (buy-zone and funds checked server-side)
    BuyWeapon { weapon: WeaponId },

    /// Room chat (truncated to 100 chars)
    Chat { msg: String },

    /// RPG detonation at a point
    RpgExplode { x: f32, y: f32, z: f32 },

    /// Damage a destructible wall
    DestroyWall { wall_id: u32, damage: Option<i32> },

    /// Nudge a physics prop
    PushObject { obj_id: u32, dx: f32, dz: f32 },

    /// Attempt to pick up an idle hostage
    RescueHostage { hostage_id: u32 },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Sent once after connect
    Welcome {
        id: ClientId,
        achievements: Vec<AchievementId>,
        weapon_prices: Vec<WeaponListing>,
    },

    RoomList {
        rooms: Vec<RoomSummary>,
    },

    /// Full room snapshot sent to the joining client
    JoinedRoom {
        id: RoomId,
        name: String,
        map: MapId,
        mode: GameMode,
        size: f32,
        self_id: ClientId,
        players: Vec<PlayerSnapshot>,
        physics_objects: Vec<PropSnapshot>,
        destructible_walls: Vec<WallSnapshot>,
        hostages: Vec<HostageSnapshot>,
        scores: Scores,
    },

    JoinError {
        error: String,
    },

    PlayerJoin {
        player: PlayerSnapshot,
    },

    PlayerLeave {
        id: ClientId,
    },

    PlayerMove {
        id: ClientId,
        x: f32,
        y: f32,
        z: f32,
        rx: f32,
        ry: f32,
    },

    PlayerShoot {
        id: ClientId,
        x: f32,
        y: f32,
        z: f32,
        dx: f32,
        dy: f32,
        dz: f32,
        weapon: WeaponId,
    },

    /// Sent to the damaged player
    Hit {
        hp: i32,
        attacker_id: ClientId,
    },

    /// Sent to the shooter on a non-lethal hit
    HitConfirm {
        target_id: ClientId,
        hp: i32,
        headshot: bool,
    },

    Kill {
        killer_id: ClientId,
        victim_id: ClientId,
        weapon: WeaponId,
        headshot: bool,
        kill_cam: KillCam,
        killer_money: i32,
        victim_money: i32,
    },

    Respawn {
        id: ClientId,
        x: f32,
        y: f32,
        z: f32,
        money: i32,
    },

    WeaponSwitch {
        id: ClientId,
        weapon: WeaponId,
    },

    WeaponBought {
        weapon: WeaponId,
        money: i32,
    },

    BuyError {
        error: String,
    },

    SwitchError {
        error: String,
    },

    WallDamaged {
        wall_id: u32,
        hp: i32,
    },

    WallDestroyed {
        wall_id: u32,
        by: ClientId,
    },

    /// Non-destroyed props, sent only on observed movement
    PhysicsUpdate {
        objects: Vec<PropSnapshot>,
    },

    Explosion {
        x: f32,
        y: f32,
        z: f32,
        radius: f32,
    },

    /// Scaling-map layout change
    MapResize {
        size: f32,
        physics_objects: Vec<PropSnapshot>,
        destructible_walls: Vec<WallSnapshot>,
    },

    /// `player_id: None` means the hostage went back to idle
    HostageFollow {
        hostage_id: u32,
        player_id: Option<ClientId>,
    },

    HostageRescued {
        hostage_id: u32,
        by: ClientId,
    },

    NewAchievements {
        achievements: Vec<AchievementId>,
    },

    /// Periodic full-state snapshot
    State {
        players: Vec<PlayerSnapshot>,
        scores: Scores,
        #[serde(skip_serializing_if = "Option::is_none")]
        hostages: Option<Vec<HostageSnapshot>>,
    },

    Chat {
        id: ClientId,
        name: String,
        msg: String,
    },

    NameChange {
        id: ClientId,
        name: String,
    },

    Kicked {
        reason: String,
    },
}

/// Weapon catalog entry published in the welcome message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponListing {
    pub id: WeaponId,
    pub price: i32,
    pub damage: i32,
    pub push_force: f32,
}

/// Room summary for the lobby list and the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub map: MapId,
    pub mode: GameMode,
    pub players: usize,
    pub max_players: usize,
    pub has_password: bool,
}

/// Team score tally
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Scores {
    #[serde(rename = "T")]
    pub t: u32,
    #[serde(rename = "CT")]
    pub ct: u32,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
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
    pub kills: u32,
    pub deaths: u32,
    pub moving: bool,
}

/// Prop kind for the client's model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropKind {
    Barrel,
    Crate,
}

/// Physics prop state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropSnapshot {
    pub id: u32,
    pub kind: PropKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub size: f32,
}

/// Destructible wall state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
    pub h: f32,
    pub d: f32,
    pub hp: i32,
}

/// Hostage state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostageSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rescued: bool,
    pub following: Option<ClientId>,
}

/// Compact killer/victim payload for client-side kill replay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillCam {
    pub killer_name: String,
    pub killer_x: f32,
    pub killer_y: f32,
    pub killer_z: f32,
    pub victim_x: f32,
    pub victim_y: f32,
    pub victim_z: f32,
    pub weapon: WeaponId,
    pub headshot: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_msg_wire_format() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"joinRoom","roomId":3,"password":null}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMsg::JoinRoom {
                room_id: 3,
                password: None
            }
        ));

        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"shoot","x":0,"y":1.5,"z":0,"dx":1,"dy":0,"dz":0,"weapon":"ak47"}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMsg::Shoot {
                weapon: WeaponId::Ak47,
                ..
            }
        ));
    }

    #[test]
    fn malformed_frame_is_an_error() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"warpSpeed"}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>("not json").is_err());
    }

    #[test]
    fn server_msg_uses_camel_case_tags() {
        let json = serde_json::to_string(&ServerMsg::JoinError {
            error: "Room is full".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"joinError""#));

        let json = serde_json::to_string(&ServerMsg::State {
            players: vec![],
            scores: Scores { t: 1, ct: 2 },
            hostages: None,
        })
        .unwrap();
        assert!(json.contains(r#""T":1"#));
        assert!(json.contains(r#""CT":2"#));
        assert!(!json.contains("hostages"));
    }
}
