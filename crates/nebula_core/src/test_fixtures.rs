//! Shared fixtures for unit/integration tests across the workspace.
//! Gated behind the `test-support` feature.

use std::collections::{BTreeMap, HashMap};

use crate::content::{
    ComponentDef, ComponentDefId, ComponentType, GameContent, InstallationDef, InstallationDefId, Resource,
    ResourceId, ShipDesign, ShipDesignId, ShipRole, TechDef, TechDefId, TechEffect,
};
use crate::id::{Id, IdAllocator};
use crate::orders::ShipOrders;
use crate::state::{ControlMode, Faction, GameState, VictoryRules, VictoryState};

pub fn base_content() -> GameContent {
    let mut resources = HashMap::new();
    for (id, name, category, mineable) in [
        ("duranium", "Duranium", "Metal", true),
        ("tritanium", "Tritanium", "Metal", true),
        ("boronide", "Boronide", "Mineral", true),
        ("corundium", "Corundium", "Mineral", true),
        ("gallicite", "Gallicite", "Mineral", true),
        ("uridium", "Uridium", "Mineral", true),
        ("mercassium", "Mercassium", "Mineral", true),
        ("metals", "Metals", "Processed", false),
        ("minerals", "Minerals", "Processed", false),
        ("fuel", "Fuel", "Processed", false),
    ] {
        resources.insert(
            ResourceId::from(id),
            Resource {
                id: ResourceId::from(id),
                name: name.to_string(),
                category: category.to_string(),
                mineable,
                salvage_research_rp_per_ton: if mineable { 0.0 } else { 0.1 },
            },
        );
    }

    let mut components = HashMap::new();
    components.insert(
        ComponentDefId::from("engine_basic"),
        ComponentDef {
            id: ComponentDefId::from("engine_basic"),
            name: "Basic Engine".to_string(),
            kind: ComponentType::Engine,
            speed_km_s: 5.0,
            fuel_use_per_mkm: 0.1,
            fuel_capacity: 500.0,
            signature_multiplier: 1.0,
            ..Default::default()
        },
    );
    components.insert(
        ComponentDefId::from("cargo_hold"),
        ComponentDef {
            id: ComponentDefId::from("cargo_hold"),
            name: "Cargo Hold".to_string(),
            kind: ComponentType::Cargo,
            cargo_tons: 200.0,
            mining_tons_per_day: 10.0,
            signature_multiplier: 1.0,
            ..Default::default()
        },
    );
    components.insert(
        ComponentDefId::from("sensor_basic"),
        ComponentDef {
            id: ComponentDefId::from("sensor_basic"),
            name: "Basic Sensor".to_string(),
            kind: ComponentType::Sensor,
            sensor_range_mkm: 50.0,
            signature_multiplier: 1.0,
            ..Default::default()
        },
    );
    components.insert(
        ComponentDefId::from("weapon_laser"),
        ComponentDef {
            id: ComponentDefId::from("weapon_laser"),
            name: "Laser".to_string(),
            kind: ComponentType::Weapon,
            weapon_damage: 5.0,
            weapon_range_mkm: 10.0,
            signature_multiplier: 1.0,
            ..Default::default()
        },
    );

    let mut designs = HashMap::new();
    designs.insert(
        ShipDesignId::from("surveyor_mk1"),
        ShipDesign {
            id: ShipDesignId::from("surveyor_mk1"),
            name: "Surveyor Mk1".to_string(),
            role: ShipRole::Surveyor,
            components: vec![
                ComponentDefId::from("engine_basic"),
                ComponentDefId::from("sensor_basic"),
                ComponentDefId::from("cargo_hold"),
            ],
            stats: Default::default(),
        },
    );
    designs.insert(
        ShipDesignId::from("frigate_mk1"),
        ShipDesign {
            id: ShipDesignId::from("frigate_mk1"),
            name: "Frigate Mk1".to_string(),
            role: ShipRole::Combatant,
            components: vec![ComponentDefId::from("engine_basic"), ComponentDefId::from("weapon_laser")],
            stats: Default::default(),
        },
    );

    let mut installations = HashMap::new();
    installations.insert(
        InstallationDefId::from("metal_smelter"),
        InstallationDef {
            id: InstallationDefId::from("metal_smelter"),
            name: "Metal Smelter".to_string(),
            consumes_per_day: HashMap::from([(ResourceId::from("duranium"), 100.0)]),
            produces_per_day: HashMap::from([(ResourceId::from("metals"), 100.0)]),
            ..Default::default()
        },
    );
    installations.insert(
        InstallationDefId::from("mineral_processor"),
        InstallationDef {
            id: InstallationDefId::from("mineral_processor"),
            name: "Mineral Processor".to_string(),
            consumes_per_day: HashMap::from([
                (ResourceId::from("tritanium"), 10.0),
                (ResourceId::from("boronide"), 10.0),
                (ResourceId::from("corundium"), 10.0),
                (ResourceId::from("gallicite"), 10.0),
                (ResourceId::from("uridium"), 5.0),
                (ResourceId::from("mercassium"), 5.0),
            ]),
            produces_per_day: HashMap::from([(ResourceId::from("minerals"), 100.0)]),
            ..Default::default()
        },
    );
    installations.insert(
        InstallationDefId::from("research_lab"),
        InstallationDef {
            id: InstallationDefId::from("research_lab"),
            name: "Research Lab".to_string(),
            research_points_per_day: 10.0,
            ..Default::default()
        },
    );

    let mut techs = HashMap::new();
    techs.insert(
        TechDefId::from("tech_deep_scan_v1"),
        TechDef {
            id: TechDefId::from("tech_deep_scan_v1"),
            name: "Deep Scan I".to_string(),
            cost: 100.0,
            prereqs: Vec::new(),
            effects: vec![TechEffect::UnlockComponent {
                value: "sensor_basic".to_string(),
            }],
        },
    );
    techs.insert(
        TechDefId::from("tech_deep_scan_v2"),
        TechDef {
            id: TechDefId::from("tech_deep_scan_v2"),
            name: "Deep Scan II".to_string(),
            cost: 50.0,
            prereqs: vec![TechDefId::from("tech_deep_scan_v1")],
            effects: vec![TechEffect::UnlockComponent {
                value: "weapon_laser".to_string(),
            }],
        },
    );

    GameContent {
        content_version: "test".to_string(),
        resources,
        components,
        installations,
        designs,
        techs,
    }
}

/// A minimal but fully cross-reference-consistent state: one system, one
/// faction, no ships/colonies. Good starting point for validator/planner
/// tests that insert their own entities on top.
pub fn empty_state(_content: &GameContent, seed: u64) -> GameState {
    let mut next_id = IdAllocator::starting_at(1);
    let faction_id = next_id.alloc();

    let mut factions = BTreeMap::new();
    factions.insert(
        faction_id,
        Faction {
            id: faction_id,
            name: "Player".to_string(),
            control_mode: ControlMode::Player,
            research_points: 0.0,
            active_research_id: None,
            active_research_progress: 0.0,
            research_queue: Vec::new(),
            known_techs: Default::default(),
            unlocked_components: Default::default(),
            unlocked_installations: Default::default(),
            discovered_systems: Default::default(),
            ship_contacts: HashMap::new(),
            diplomacy: HashMap::new(),
            system_notes: HashMap::new(),
            journal: Vec::new(),
        },
    );

    GameState {
        save_version: 1,
        date_days: 0,
        hour_of_day: 0,
        next_id,
        next_event_seq: 1,
        selected_system: None,
        seed,
        systems: BTreeMap::new(),
        bodies: BTreeMap::new(),
        jump_points: BTreeMap::new(),
        ships: BTreeMap::new(),
        ship_orders: BTreeMap::new(),
        colonies: BTreeMap::new(),
        factions,
        fleets: BTreeMap::new(),
        regions: BTreeMap::new(),
        anomalies: BTreeMap::new(),
        wrecks: BTreeMap::new(),
        contracts: BTreeMap::new(),
        events: Vec::new(),
        custom_designs: HashMap::new(),
        victory_rules: VictoryRules::default(),
        victory_state: VictoryState::default(),
    }
}

pub fn empty_ship_orders() -> ShipOrders {
    ShipOrders::default()
}
