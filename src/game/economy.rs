//! Weapon catalog, purchases, and achievement bookkeeping

use std::collections::HashSet;

use crate::ws::protocol::{AchievementId, WeaponId, WeaponListing};

use super::room::Player;

/// Money granted to the killer on a lethal hit
pub const KILL_REWARD: i32 = 300;

/// Money deducted from the victim on death (floored at 0)
pub const DEATH_PENALTY: i32 = 100;

/// Starting money for a freshly joined player
pub const START_MONEY: i32 = 800;

/// Money threshold for the `rich` achievement
pub const RICH_THRESHOLD: i32 = 10_000;

/// Lifetime headshot count for `headshot_master`
pub const HEADSHOT_MASTER_COUNT: u32 = 10;

/// Kill-streak length for `killstreak_5`
pub const KILLSTREAK_COUNT: u32 = 5;

/// Lifetime wall count for `demolition_man`
pub const DEMOLITION_COUNT: u32 = 10;

/// Static per-weapon configuration
#[derive(Debug, Clone, Copy)]
pub struct WeaponSpec {
    pub price: i32,
    pub damage: i32,
    /// Velocity impulse applied to props hit along the shot ray
    pub push_force: f32,
}

impl WeaponId {
    pub fn spec(self) -> WeaponSpec {
        match self {
            WeaponId::Knife => WeaponSpec {
                price: 0,
                damage: 55,
                push_force: 0.0,
            },
            WeaponId::Deagle => WeaponSpec {
                price: 700,
                damage: 45,
                push_force: 10.0,
            },
            WeaponId::Ak47 => WeaponSpec {
                price: 2700,
                damage: 27,
                push_force: 8.0,
            },
            WeaponId::Awp => WeaponSpec {
                price: 4750,
                damage: 110,
                push_force: 20.0,
            },
            // RPG damage resolves through the explosion path, not hitscan
            WeaponId::Rpg => WeaponSpec {
                price: 6500,
                damage: 95,
                push_force: 0.0,
            },
        }
    }

    pub fn all() -> [WeaponId; 5] {
        [
            WeaponId::Knife,
            WeaponId::Deagle,
            WeaponId::Ak47,
            WeaponId::Awp,
            WeaponId::Rpg,
        ]
    }

    /// Weapons whose shots also shove physics props
    pub fn pushes_props(self) -> bool {
        !matches!(self, WeaponId::Knife | WeaponId::Rpg)
    }
}

/// Catalog published in the welcome message
pub fn weapon_catalog() -> Vec<WeaponListing> {
    WeaponId::all()
        .into_iter()
        .map(|id| {
            let spec = id.spec();
            WeaponListing {
                id,
                price: spec.price,
                damage: spec.damage,
                push_force: spec.push_force,
            }
        })
        .collect()
}

/// Purchase rejection reasons, surfaced as `buyError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BuyError {
    #[error("Unknown weapon")]
    UnknownWeapon,
    #[error("Weapon already owned")]
    AlreadyOwned,
    #[error("Not in buy zone")]
    OutsideBuyZone,
    #[error("Not enough money")]
    InsufficientFunds,
}

/// Switch rejection, surfaced as `switchError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SwitchError {
    #[error("Weapon not owned")]
    NotOwned,
}

/// Validate and apply a weapon purchase. No state change on error.
pub fn try_buy(player: &mut Player, weapon: WeaponId, in_buy_zone: bool) -> Result<(), BuyError> {
    let spec = weapon.spec();
    if spec.price <= 0 {
        // The knife is free and always owned; buying it makes no sense
        return Err(BuyError::UnknownWeapon);
    }
    if player.owned.contains(&weapon) {
        return Err(BuyError::AlreadyOwned);
    }
    if !in_buy_zone {
        return Err(BuyError::OutsideBuyZone);
    }
    if player.money < spec.price {
        return Err(BuyError::InsufficientFunds);
    }

    player.money -= spec.price;
    player.owned.insert(weapon);
    player.weapon = weapon;
    Ok(())
}

/// Validate and apply a weapon switch
pub fn try_switch(player: &mut Player, weapon: WeaponId) -> Result<(), SwitchError> {
    if !player.owned.contains(&weapon) {
        return Err(SwitchError::NotOwned);
    }
    player.weapon = weapon;
    Ok(())
}

/// Add an achievement to the set, returning true if newly unlocked
pub fn unlock(set: &mut HashSet<AchievementId>, id: AchievementId) -> bool {
    set.insert(id)
}
