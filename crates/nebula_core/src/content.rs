//! ContentDB — immutable-at-tick content definitions: resources, components,
//! ship designs, installations, and techs.
//!
//! String-keyed the same way entity ids are keyed elsewhere, via the
//! `string_id!` newtype-generator macro.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_id!(ResourceId);
string_id!(ComponentDefId);
string_id!(ShipDesignId);
string_id!(InstallationDefId);
string_id!(TechDefId);

pub type TonsMap = HashMap<ResourceId, f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub category: String,
    pub mineable: bool,
    /// Non-negative. Fuel is a manufactured, non-mineable resource.
    pub salvage_research_rp_per_ton: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentType {
    Engine,
    Cargo,
    Sensor,
    Reactor,
    Weapon,
    Armor,
    MissileRack,
    PointDefense,
    Shield,
    TroopBay,
    ColonyModule,
    Fuel,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentDef {
    pub id: ComponentDefId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub mass: f64,
    pub speed_km_s: f64,
    pub fuel_use_per_mkm: f64,
    pub fuel_capacity: f64,
    pub cargo_tons: f64,
    pub mining_tons_per_day: f64,
    pub sensor_range_mkm: f64,
    /// Fraction of base signature this component contributes. Clamped [0,1].
    pub signature_multiplier: f64,
    pub colony_capacity: f64,
    pub troop_capacity: f64,
    pub power_output: f64,
    pub power_use: f64,
    pub weapon_damage: f64,
    pub weapon_range_mkm: f64,
    pub missile_damage: f64,
    pub missile_range_mkm: f64,
    pub missile_speed_mkm_per_day: f64,
    pub missile_reload_days: f64,
    pub point_defense_damage: f64,
    pub point_defense_range_mkm: f64,
    pub hp_bonus: f64,
    pub shield_hp: f64,
    pub shield_regen_per_day: f64,
}

impl Default for ComponentDef {
    fn default() -> Self {
        ComponentDef {
            id: ComponentDefId(String::new()),
            name: String::new(),
            kind: ComponentType::Unknown,
            mass: 0.0,
            speed_km_s: 0.0,
            fuel_use_per_mkm: 0.0,
            fuel_capacity: 0.0,
            cargo_tons: 0.0,
            mining_tons_per_day: 0.0,
            sensor_range_mkm: 0.0,
            signature_multiplier: 1.0,
            colony_capacity: 0.0,
            troop_capacity: 0.0,
            power_output: 0.0,
            power_use: 0.0,
            weapon_damage: 0.0,
            weapon_range_mkm: 0.0,
            missile_damage: 0.0,
            missile_range_mkm: 0.0,
            missile_speed_mkm_per_day: 0.0,
            missile_reload_days: 0.0,
            point_defense_damage: 0.0,
            point_defense_range_mkm: 0.0,
            hp_bonus: 0.0,
            shield_hp: 0.0,
            shield_regen_per_day: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipRole {
    Freighter,
    Surveyor,
    Combatant,
    Unknown,
}

/// Aggregate stats derived from a design's component list. Kept as a cache
/// on `ShipDesign` and recomputed on content load/reload — never hand
/// edited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignStats {
    pub mass_tons: f64,
    pub speed_km_s: f64,
    pub fuel_capacity: f64,
    pub fuel_use_per_mkm: f64,
    pub cargo_tons: f64,
    pub mining_tons_per_day: f64,
    pub sensor_range_mkm: f64,
    pub signature: f64,
    pub colony_capacity: f64,
    pub troop_capacity: f64,
    pub max_hp: f64,
    pub max_shields: f64,
    pub shield_regen_per_day: f64,
    pub weapon_damage: f64,
    pub weapon_range_mkm: f64,
    pub missile_damage: f64,
    pub missile_range_mkm: f64,
    pub missile_speed_mkm_per_day: f64,
    pub missile_reload_days: f64,
    pub missile_rack_count: u32,
    pub point_defense_damage: f64,
    pub point_defense_range_mkm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipDesign {
    pub id: ShipDesignId,
    pub name: String,
    pub role: ShipRole,
    pub components: Vec<ComponentDefId>,
    #[serde(default)]
    pub stats: DesignStats,
}

/// Recompute `DesignStats` from a design's component list. Pure; called by
/// the orchestrator on load/new_game/content-reload, never during a tick.
pub fn compute_design_stats(design: &ShipDesign, components: &HashMap<ComponentDefId, ComponentDef>) -> DesignStats {
    let mut stats = DesignStats::default();
    let base_hp = 10.0;
    stats.max_hp = base_hp;
    let mut missile_reload_min = f64::INFINITY;

    for comp_id in &design.components {
        let Some(c) = components.get(comp_id) else {
            continue;
        };
        stats.mass_tons += c.mass;
        stats.speed_km_s = stats.speed_km_s.max(c.speed_km_s);
        stats.fuel_capacity += c.fuel_capacity;
        stats.fuel_use_per_mkm += c.fuel_use_per_mkm;
        stats.cargo_tons += c.cargo_tons;
        stats.mining_tons_per_day += c.mining_tons_per_day;
        stats.sensor_range_mkm = stats.sensor_range_mkm.max(c.sensor_range_mkm);
        stats.colony_capacity += c.colony_capacity;
        stats.troop_capacity += c.troop_capacity;
        stats.max_hp += c.hp_bonus;
        stats.max_shields += c.shield_hp;
        stats.shield_regen_per_day += c.shield_regen_per_day;
        stats.weapon_damage += c.weapon_damage;
        stats.weapon_range_mkm = stats.weapon_range_mkm.max(c.weapon_range_mkm);
        if matches!(c.kind, ComponentType::MissileRack) {
            stats.missile_rack_count += 1;
            stats.missile_damage += c.missile_damage;
            stats.missile_range_mkm = stats.missile_range_mkm.max(c.missile_range_mkm);
            stats.missile_speed_mkm_per_day = stats.missile_speed_mkm_per_day.max(c.missile_speed_mkm_per_day);
            if c.missile_reload_days > 0.0 {
                missile_reload_min = missile_reload_min.min(c.missile_reload_days);
            }
        }
        stats.point_defense_damage += c.point_defense_damage;
        stats.point_defense_range_mkm = stats.point_defense_range_mkm.max(c.point_defense_range_mkm);
    }
    // Signature: the minimum (most stealthy) multiplier contributed by any
    // component, clamped to [0,1].
    stats.signature = design
        .components
        .iter()
        .filter_map(|id| components.get(id))
        .map(|c| c.signature_multiplier.clamp(0.0, 1.0))
        .fold(1.0_f64, f64::min);
    stats.missile_reload_days = if missile_reload_min.is_finite() {
        missile_reload_min
    } else {
        0.0
    };
    stats
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InstallationDef {
    pub id: InstallationDefId,
    pub name: String,
    #[serde(default)]
    pub produces_per_day: TonsMap,
    #[serde(default)]
    pub consumes_per_day: TonsMap,
    pub construction_points_per_day: f64,
    pub mining_tons_per_day: f64,
    pub build_rate_tons_per_day: f64,
    #[serde(default)]
    pub build_costs_per_ton: TonsMap,
    pub sensor_range_mkm: f64,
    pub weapon_damage: f64,
    pub weapon_range_mkm: f64,
    pub research_points_per_day: f64,
    pub terraforming_points_per_day: f64,
    pub troop_training_points_per_day: f64,
    pub habitation_capacity: f64,
    pub fortification_points: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TechEffect {
    UnlockComponent { value: String },
    UnlockInstallation { value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechDef {
    pub id: TechDefId,
    pub name: String,
    pub cost: f64,
    pub prereqs: Vec<TechDefId>,
    pub effects: Vec<TechEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GameContent {
    pub content_version: String,
    pub resources: HashMap<ResourceId, Resource>,
    pub components: HashMap<ComponentDefId, ComponentDef>,
    pub installations: HashMap<InstallationDefId, InstallationDef>,
    pub designs: HashMap<ShipDesignId, ShipDesign>,
    pub techs: HashMap<TechDefId, TechDef>,
}

impl GameContent {
    /// Recompute every design's cached stats from the current component
    /// table. The only place ship speed/hp may change discontinuously —
    /// called after content hot-reload.
    pub fn recompute_design_stats(&mut self) {
        let components = self.components.clone();
        for design in self.designs.values_mut() {
            design.stats = compute_design_stats(design, &components);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(id: &str, speed: f64) -> ComponentDef {
        ComponentDef {
            id: ComponentDefId::from(id),
            kind: ComponentType::Engine,
            speed_km_s: speed,
            ..Default::default()
        }
    }

    #[test]
    fn design_stats_sum_mass_and_max_speed() {
        let mut components = HashMap::new();
        components.insert(ComponentDefId::from("engine_a"), engine("engine_a", 5.0));
        components.insert(ComponentDefId::from("engine_b"), engine("engine_b", 9.0));
        let design = ShipDesign {
            id: ShipDesignId::from("ship_test"),
            name: "Test".into(),
            role: ShipRole::Unknown,
            components: vec![ComponentDefId::from("engine_a"), ComponentDefId::from("engine_b")],
            stats: DesignStats::default(),
        };
        let stats = compute_design_stats(&design, &components);
        assert!((stats.speed_km_s - 9.0).abs() < 1e-9);
    }

    #[test]
    fn signature_is_the_stealthiest_component() {
        let mut components = HashMap::new();
        let mut hull = ComponentDef {
            id: ComponentDefId::from("hull"),
            signature_multiplier: 1.0,
            ..Default::default()
        };
        hull.signature_multiplier = 1.0;
        let mut stealth = ComponentDef {
            id: ComponentDefId::from("stealth"),
            signature_multiplier: 0.4,
            ..Default::default()
        };
        stealth.signature_multiplier = 0.4;
        components.insert(ComponentDefId::from("hull"), hull);
        components.insert(ComponentDefId::from("stealth"), stealth);
        let design = ShipDesign {
            id: ShipDesignId::from("ship_test"),
            name: "Test".into(),
            role: ShipRole::Unknown,
            components: vec![ComponentDefId::from("hull"), ComponentDefId::from("stealth")],
            stats: DesignStats::default(),
        };
        let stats = compute_design_stats(&design, &components);
        assert!((stats.signature - 0.4).abs() < 1e-9);
    }
}
