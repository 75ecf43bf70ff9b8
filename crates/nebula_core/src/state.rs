//! `GameState` — the mutable world.
//!
//! Collections are `BTreeMap<Id, T>` so that ascending-id iteration (the
//! load-bearing determinism invariant for everything downstream) is simply
//! "iterate the map", not a sort performed at every call site.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::content::{InstallationDefId, ResourceId, ShipDesignId, TechDefId, TonsMap};
use crate::id::{Id, IdAllocator};
use crate::orders::{FleetMission, ShipOrders};
use crate::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    Star,
    Planet,
    Moon,
    Asteroid,
    Comet,
    GasGiant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitalParams {
    pub radius_mkm: f64,
    pub period_days: f64,
    pub phase_radians: f64,
}

impl OrbitalParams {
    /// Position along a circular orbit at the given simulated day.
    pub fn position_at(&self, day: f64) -> Vec2 {
        if self.period_days <= 0.0 {
            return Vec2::new(self.radius_mkm, 0.0);
        }
        let angle = self.phase_radians + std::f64::consts::TAU * (day / self.period_days);
        Vec2::new(self.radius_mkm * angle.cos(), self.radius_mkm * angle.sin())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: Id,
    pub system_id: Id,
    pub name: String,
    pub body_type: BodyType,
    pub orbit: OrbitalParams,
    #[serde(default)]
    pub position_mkm: Vec2,
    pub surface_temp_k: f64,
    pub atmosphere_atm: f64,
    pub terraform_target_temp_k: Option<f64>,
    pub terraform_target_atm: Option<f64>,
    /// Empty map means "unlimited/unknown" (compat with scenarios that omit it).
    #[serde(default)]
    pub mineral_deposits: TonsMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarSystem {
    pub id: Id,
    pub name: String,
    pub galaxy_pos: Vec2,
    pub bodies: Vec<Id>,
    pub ships: Vec<Id>,
    pub jump_points: Vec<Id>,
    pub region_id: Id,
    pub nebula_density: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpPoint {
    pub id: Id,
    pub system_id: Id,
    pub position_mkm: Vec2,
    /// `Id::INVALID` if unlinked. Validator requires mutual linkage.
    pub linked_jump_id: Id,
    /// faction_id -> survey progress in days of sensor-power-days.
    #[serde(default)]
    pub survey_progress: HashMap<Id, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipAutomation {
    pub auto_mine: bool,
    pub auto_salvage: bool,
    pub auto_freight: bool,
    pub auto_explore: bool,
    pub auto_colonize: bool,
    pub auto_tanker: bool,
    pub auto_troop: bool,
    pub auto_colonist: bool,
    pub auto_terraform: bool,
    pub home_colony: Option<Id>,
    pub auto_mine_mineral: Option<ResourceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub id: Id,
    pub faction_id: Id,
    pub system_id: Id,
    pub position_mkm: Vec2,
    pub design_id: ShipDesignId,
    pub hp: f64,
    pub shields: f64,
    pub fuel: f64,
    #[serde(default)]
    pub cargo: TonsMap,
    pub troops: f64,
    pub automation: ShipAutomation,
    /// Missile-rack reload clocks, indexed same order as the design's racks.
    #[serde(default)]
    pub missile_reload_remaining_days: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOrder {
    pub design_id: ShipDesignId,
    pub tons_total: f64,
    pub tons_remaining: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationOrder {
    pub installation_id: InstallationDefId,
    pub cp_total: f64,
    pub cp_remaining: f64,
    pub quantity_remaining: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundForces {
    pub troops: f64,
    pub fortification_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Colony {
    pub id: Id,
    pub faction_id: Id,
    pub body_id: Id,
    pub population_millions: f64,
    #[serde(default)]
    pub stockpile: TonsMap,
    #[serde(default)]
    pub installations: HashMap<InstallationDefId, u32>,
    #[serde(default)]
    pub shipyard_queue: Vec<BuildOrder>,
    #[serde(default)]
    pub construction_queue: Vec<InstallationOrder>,
    #[serde(default)]
    pub ground_forces: GroundForces,
    pub troop_training_queue: f64,
    #[serde(default)]
    pub installation_targets: HashMap<InstallationDefId, u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    Player,
    AiExplorer,
    AiPirate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipContact {
    pub last_known_position_mkm: Vec2,
    pub last_known_system_id: Id,
    pub last_seen_tick: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faction {
    pub id: Id,
    pub name: String,
    pub control_mode: ControlMode,
    pub research_points: f64,
    pub active_research_id: Option<TechDefId>,
    pub active_research_progress: f64,
    #[serde(default)]
    pub research_queue: Vec<TechDefId>,
    #[serde(default)]
    pub known_techs: BTreeSet<TechDefId>,
    #[serde(default)]
    pub unlocked_components: BTreeSet<crate::content::ComponentDefId>,
    #[serde(default)]
    pub unlocked_installations: BTreeSet<InstallationDefId>,
    #[serde(default)]
    pub discovered_systems: BTreeSet<Id>,
    #[serde(default)]
    pub ship_contacts: HashMap<Id, ShipContact>,
    #[serde(default)]
    pub diplomacy: HashMap<Id, f64>,
    #[serde(default)]
    pub system_notes: HashMap<Id, String>,
    #[serde(default)]
    pub journal: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fleet {
    pub id: Id,
    pub faction_id: Id,
    pub ship_ids: BTreeSet<Id>,
    pub leader_ship_id: Option<Id>,
    pub mission: FleetMission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnomalyKind {
    DerelictSignal,
    SensorGhost,
    Ruins,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: Id,
    pub system_id: Id,
    pub position_mkm: Vec2,
    pub kind: AnomalyKind,
    pub lead_chain: Vec<String>,
    pub resolution_faction_id: Option<Id>,
    pub investigation_progress: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wreck {
    pub id: Id,
    pub system_id: Id,
    pub position_mkm: Vec2,
    #[serde(default)]
    pub minerals: TonsMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractKind {
    InvestigateAnomaly,
    SalvageWreck,
    SurveyJumpPoint,
    EscortConvoy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Offered,
    Accepted,
    Completed,
    Expired,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Id,
    pub kind: ContractKind,
    pub status: ContractStatus,
    pub issuer_faction_id: Id,
    pub assignee_faction_id: Option<Id>,
    pub assigned_ship_id: Option<Id>,
    pub target_id: Id,
    /// Escort destination system; unused by other kinds.
    pub target_id2: Option<Id>,
    pub reward_research_points: f64,
    pub risk_estimate: f64,
    pub hops_estimate: u32,
    pub offered_day: f64,
    pub accepted_day: Option<f64>,
    pub expires_day: f64,
    pub resolved_day: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionModifiers {
    pub mineral_richness_mult: f64,
    pub volatile_richness_mult: f64,
    pub salvage_richness_mult: f64,
    pub nebula_bias: f64,
    pub pirate_risk: f64,
    pub pirate_suppression: f64,
    pub ruins_density: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: Id,
    pub name: String,
    pub center: Vec2,
    pub modifiers: RegionModifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub seq: u64,
    pub day: f64,
    pub level: EventLevel,
    pub category: String,
    pub faction_id: Option<Id>,
    pub ship_id: Option<Id>,
    pub colony_id: Option<Id>,
    pub system_id: Option<Id>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VictoryReason {
    LastFactionStanding,
    ScoreThreshold,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VictoryState {
    pub game_over: bool,
    pub winner_faction_id: Option<Id>,
    pub reason: Option<VictoryReason>,
    /// Set once the terminal event has been emitted, so it fires exactly once.
    #[serde(default)]
    pub terminal_event_emitted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VictoryRules {
    pub enabled: bool,
    pub exclude_pirates: bool,
    pub elimination_enabled: bool,
    pub elimination_requires_colony: bool,
    pub score_threshold: f64,
}

impl Default for VictoryRules {
    fn default() -> Self {
        VictoryRules {
            enabled: true,
            exclude_pirates: true,
            elimination_enabled: true,
            elimination_requires_colony: true,
            score_threshold: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub save_version: u32,
    pub date_days: u64,
    pub hour_of_day: u8,
    pub next_id: IdAllocator,
    pub next_event_seq: u64,
    pub selected_system: Option<Id>,
    pub seed: u64,

    pub systems: BTreeMap<Id, StarSystem>,
    pub bodies: BTreeMap<Id, Body>,
    pub jump_points: BTreeMap<Id, JumpPoint>,
    pub ships: BTreeMap<Id, Ship>,
    pub ship_orders: BTreeMap<Id, ShipOrders>,
    pub colonies: BTreeMap<Id, Colony>,
    pub factions: BTreeMap<Id, Faction>,
    pub fleets: BTreeMap<Id, Fleet>,
    pub regions: BTreeMap<Id, Region>,
    pub anomalies: BTreeMap<Id, Anomaly>,
    pub wrecks: BTreeMap<Id, Wreck>,
    pub contracts: BTreeMap<Id, Contract>,
    pub events: Vec<SimEvent>,
    /// Designs authored in-session (ship yard refits etc), distinct from
    /// the ContentDB designs loaded at startup — lookups check both.
    #[serde(default)]
    pub custom_designs: HashMap<ShipDesignId, crate::content::ShipDesign>,
    pub victory_rules: VictoryRules,
    pub victory_state: VictoryState,
}

impl GameState {
    pub fn day_fraction(&self) -> f64 {
        self.date_days as f64 + self.hour_of_day as f64 / 24.0
    }

    pub fn emit(&mut self, level: EventLevel, category: &str, message: String) {
        let seq = self.next_event_seq;
        self.next_event_seq += 1;
        self.events.push(SimEvent {
            seq,
            day: self.day_fraction(),
            level,
            category: category.to_string(),
            faction_id: None,
            ship_id: None,
            colony_id: None,
            system_id: None,
            message,
        });
    }
}
