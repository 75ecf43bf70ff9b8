//! World generation and content loading shared between `nebula_cli` and
//! `nebula_daemon`.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rand::Rng;
use serde_json::{Map, Value};

use nebula_core::content::{
    ComponentDefId, GameContent, InstallationDefId, ShipRole, TechDefId, TechEffect,
};
use nebula_core::orders::ShipOrders;
use nebula_core::planners;
use nebula_core::state::{
    Body, BodyType, Colony, ControlMode, Faction, GameState, GroundForces, JumpPoint, OrbitalParams,
    Region, RegionModifiers, Ship, ShipAutomation, StarSystem, VictoryRules, VictoryState,
};
use nebula_core::{Id, IdAllocator, Vec2};

// ---------------------------------------------------------------------------
// Content loading: include/overlay merge-patch
// ---------------------------------------------------------------------------

fn read_json_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn include_list(value: &Value) -> Vec<String> {
    let Some(obj) = value.as_object() else { return Vec::new() };
    match obj.get("include").or_else(|| obj.get("includes")) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

/// Designs/techs are authored as arrays in content files but overlay
/// per-entry, so they're reshaped into id-keyed objects before any
/// merge-patch runs and stay that way through to final deserialization.
fn array_to_id_map(value: &mut Value, field: &str) {
    let Some(obj) = value.as_object_mut() else { return };
    if let Some(Value::Array(items)) = obj.get(field).cloned() {
        let mut map = Map::new();
        for item in items {
            if let Some(id) = item.get("id").and_then(Value::as_str) {
                map.insert(id.to_string(), item);
            }
        }
        obj.insert(field.to_string(), Value::Object(map));
    }
}

/// RFC-7396 JSON Merge Patch: objects merge key by key, `null` deletes a key,
/// anything else (including arrays) replaces the target wholesale.
fn merge_patch(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(patch_obj) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            let target_obj = target.as_object_mut().expect("just ensured object");
            for (key, patch_value) in patch_obj {
                if patch_value.is_null() {
                    target_obj.remove(&key);
                    continue;
                }
                let mut slot = target_obj.remove(&key).unwrap_or(Value::Null);
                merge_patch(&mut slot, patch_value);
                target_obj.insert(key, slot);
            }
        }
        other => *target = other,
    }
}

/// Loads one content file, resolving its `include`/`includes` chain
/// depth-first, then overlaying the file's own body on top of them.
fn load_with_includes(path: &Path, stack: &mut Vec<PathBuf>) -> Result<Value> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if stack.contains(&canonical) {
        bail!("include cycle detected at {}", path.display());
    }
    stack.push(canonical);

    let mut own = read_json_file(path)?;
    let includes = include_list(&own);
    if let Some(obj) = own.as_object_mut() {
        obj.remove("include");
        obj.remove("includes");
    }
    array_to_id_map(&mut own, "designs");
    array_to_id_map(&mut own, "techs");

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut merged = Value::Object(Map::new());
    for include in includes {
        let included = load_with_includes(&base_dir.join(&include), stack)?;
        merge_patch(&mut merged, included);
    }
    merge_patch(&mut merged, own);
    stack.pop();
    Ok(merged)
}

/// Applies `components_add`/`components_remove` overlay keys to every merged
/// design, then strips both so they never reach `ShipDesign` deserialization.
fn apply_design_component_patches(value: &mut Value) {
    let Some(designs) = value.get_mut("designs").and_then(Value::as_object_mut) else { return };
    for design in designs.values_mut() {
        let Some(obj) = design.as_object_mut() else { continue };
        let add = obj.remove("components_add").and_then(|v| v.as_array().cloned());
        let remove = obj.remove("components_remove").and_then(|v| v.as_array().cloned());
        if add.is_none() && remove.is_none() {
            continue;
        }
        let mut components = obj.get("components").and_then(Value::as_array).cloned().unwrap_or_default();
        if let Some(add) = add {
            for id in add {
                if !components.contains(&id) {
                    components.push(id);
                }
            }
        }
        if let Some(remove) = remove {
            components.retain(|c| !remove.contains(c));
        }
        obj.insert("components".to_string(), Value::Array(components));
    }
}

fn fill_content_defaults(merged: &mut Value) {
    let obj = merged.as_object_mut().expect("merged content root must be an object");
    obj.entry("content_version").or_insert_with(|| Value::String("dev".to_string()));
    for key in ["resources", "components", "installations", "designs", "techs"] {
        obj.entry(key).or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Loads an ordered list of blueprint JSON roots, each overlaying the last,
/// and builds the resulting `GameContent`. Unknown component ids referenced
/// by a design fail loading; everything else is left to `validate_content_db`.
pub fn load_content(paths: &[String]) -> Result<GameContent> {
    if paths.is_empty() {
        bail!("no content paths given");
    }
    let mut merged = Value::Object(Map::new());
    for raw_path in paths {
        let mut stack = Vec::new();
        let loaded = load_with_includes(Path::new(raw_path), &mut stack)?;
        merge_patch(&mut merged, loaded);
    }
    apply_design_component_patches(&mut merged);
    fill_content_defaults(&mut merged);

    let mut content: GameContent = serde_json::from_value(merged).context("deserializing merged content")?;
    check_design_component_refs(&content)?;
    content.recompute_design_stats();
    Ok(content)
}

fn check_design_component_refs(content: &GameContent) -> Result<()> {
    for design in content.designs.values() {
        for comp_id in &design.components {
            if !content.components.contains_key(comp_id) {
                bail!("design '{}' references unknown component '{}'", design.id, comp_id);
            }
        }
    }
    Ok(())
}

/// Loads an ordered list of tech JSON roots (same include/overlay rules as
/// `load_content`) and merges the result into `content.techs`.
pub fn load_techs(paths: &[String], content: &mut GameContent) -> Result<()> {
    let mut merged = Value::Object(Map::new());
    for raw_path in paths {
        let mut stack = Vec::new();
        let loaded = load_with_includes(Path::new(raw_path), &mut stack)?;
        merge_patch(&mut merged, loaded);
    }
    let techs_value = merged.get("techs").cloned().unwrap_or_else(|| Value::Object(Map::new()));
    let techs: HashMap<TechDefId, nebula_core::content::TechDef> =
        serde_json::from_value(techs_value).context("deserializing merged techs")?;
    content.techs.extend(techs);
    Ok(())
}

/// Convenience wrapper: loads blueprints then tech files into one `GameContent`.
pub fn load_all_content(content_paths: &[String], tech_paths: &[String]) -> Result<GameContent> {
    let mut content = load_content(content_paths)?;
    if !tech_paths.is_empty() {
        load_techs(tech_paths, &mut content)?;
    }
    Ok(content)
}

/// Splits a `;`/`,`-separated path list, as used by `--content`/`--load` CLI
/// flags and the `NEBULA4X_CONTENT`/`NEBULA4X_TECH` environment variables.
pub fn split_path_list(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Content validation (non-fatal, sorted issue list)
// ---------------------------------------------------------------------------

/// Returns a sorted list of human-readable content issues: empty ids,
/// key/id mismatches, negative stats, `signature_multiplier > 1`, unknown
/// cross-references, dangling tech-effect targets, prereq cycles. Unlike
/// `load_content`'s hard component-ref failure, nothing here blocks a load —
/// callers decide whether to proceed on warnings.
#[allow(clippy::too_many_lines)]
pub fn validate_content_db(content: &GameContent) -> Vec<String> {
    let mut issues = Vec::new();

    for (key, resource) in &content.resources {
        if resource.id.0.is_empty() {
            issues.push(format!("resource '{key}' has an empty id"));
        }
        if resource.id.0 != *key {
            issues.push(format!("resource key '{key}' does not match id '{}'", resource.id));
        }
        if resource.salvage_research_rp_per_ton < 0.0 {
            issues.push(format!("resource '{key}' has negative salvage_research_rp_per_ton"));
        }
    }

    for (key, component) in &content.components {
        if component.id.0.is_empty() {
            issues.push(format!("component '{key}' has an empty id"));
        }
        if component.id.0 != *key {
            issues.push(format!("component key '{key}' does not match id '{}'", component.id));
        }
        if component.signature_multiplier > 1.0 {
            issues.push(format!("component '{key}' has signature_multiplier > 1"));
        }
        for (field, value) in [
            ("mass", component.mass),
            ("fuel_capacity", component.fuel_capacity),
            ("cargo_tons", component.cargo_tons),
            ("sensor_range_mkm", component.sensor_range_mkm),
        ] {
            if value < 0.0 {
                issues.push(format!("component '{key}' has negative {field}"));
            }
        }
    }

    for (key, installation) in &content.installations {
        if installation.id.0.is_empty() {
            issues.push(format!("installation '{key}' has an empty id"));
        }
        if installation.id.0 != *key {
            issues.push(format!("installation key '{key}' does not match id '{}'", installation.id));
        }
        for (resource_id, rate) in installation.produces_per_day.iter().chain(installation.consumes_per_day.iter()) {
            if *rate < 0.0 {
                issues.push(format!("installation '{key}' has a negative rate for resource '{resource_id}'"));
            }
            if !content.resources.contains_key(resource_id) {
                issues.push(format!("installation '{key}' references unknown resource '{resource_id}'"));
            }
        }
    }

    for (key, design) in &content.designs {
        if design.id.0.is_empty() {
            issues.push(format!("design '{key}' has an empty id"));
        }
        if design.id.0 != *key {
            issues.push(format!("design key '{key}' does not match id '{}'", design.id));
        }
        for comp_id in &design.components {
            if !content.components.contains_key(comp_id) {
                issues.push(format!("design '{key}' references unknown component '{comp_id}'"));
            }
        }
    }

    let tech_ids: HashSet<&TechDefId> = content.techs.keys().collect();
    for (key, tech) in &content.techs {
        if tech.id.0.is_empty() {
            issues.push(format!("tech '{key}' has an empty id"));
        }
        if tech.id.0 != *key {
            issues.push(format!("tech key '{key}' does not match id '{}'", tech.id));
        }
        if tech.cost < 0.0 {
            issues.push(format!("tech '{key}' has negative cost"));
        }
        for prereq in &tech.prereqs {
            if !tech_ids.contains(prereq) {
                issues.push(format!("tech '{key}' prereq '{prereq}' is not a known tech id"));
            }
        }
        for effect in &tech.effects {
            match effect {
                TechEffect::UnlockComponent { value } => {
                    if !content.components.contains_key(&ComponentDefId::from(value.as_str())) {
                        issues.push(format!("tech '{key}' unlocks unknown component '{value}'"));
                    }
                }
                TechEffect::UnlockInstallation { value } => {
                    if !content.installations.contains_key(&InstallationDefId::from(value.as_str())) {
                        issues.push(format!("tech '{key}' unlocks unknown installation '{value}'"));
                    }
                }
            }
        }
    }

    if let Some(cycle) = find_prereq_cycle(&content.techs) {
        issues.push(format!("tech prereq cycle: {}", cycle.join(" -> ")));
    }

    issues.sort();
    issues
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

fn find_prereq_cycle(techs: &HashMap<TechDefId, nebula_core::content::TechDef>) -> Option<Vec<String>> {
    let mut marks: HashMap<&TechDefId, Mark> = HashMap::new();
    for id in techs.keys() {
        let mut path = Vec::new();
        if let Some(cycle) = visit_prereq(id, techs, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn visit_prereq<'a>(
    id: &'a TechDefId,
    techs: &'a HashMap<TechDefId, nebula_core::content::TechDef>,
    marks: &mut HashMap<&'a TechDefId, Mark>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    match marks.get(id) {
        Some(Mark::Done) => return None,
        Some(Mark::Visiting) => {
            path.push(id.0.clone());
            return Some(path.clone());
        }
        None => {}
    }
    marks.insert(id, Mark::Visiting);
    path.push(id.0.clone());
    if let Some(tech) = techs.get(id) {
        for prereq in &tech.prereqs {
            if let Some(cycle) = visit_prereq(prereq, techs, marks, path) {
                return Some(cycle);
            }
        }
    }
    path.pop();
    marks.insert(id, Mark::Done);
    None
}

// ---------------------------------------------------------------------------
// Scenario generation
// ---------------------------------------------------------------------------

pub const DEFAULT_SYSTEM_COUNT: usize = 6;
pub const DEFAULT_BODIES_PER_SYSTEM: usize = 3;
pub const DEFAULT_REGION_COUNT: usize = 2;

fn average_position(systems: &BTreeMap<Id, StarSystem>, members: &[Id]) -> Vec2 {
    if members.is_empty() {
        return Vec2::ZERO;
    }
    let sum = members.iter().fold(Vec2::ZERO, |acc, id| acc.add(systems[id].galaxy_pos));
    sum.scale(1.0 / members.len() as f64)
}

/// Builds a small ring-connected galaxy, partitions it into regions, and
/// drops one faction with a starting colony and a single scout ship. Mirrors
/// the shape of a freshly generated game before any ticks have run.
#[allow(clippy::too_many_lines)]
pub fn build_initial_state(content: &GameContent, seed: u64, rng: &mut impl Rng) -> GameState {
    let mut next_id = IdAllocator::starting_at(1);
    let faction_id = next_id.alloc();

    let mut systems = BTreeMap::new();
    let mut system_ids = Vec::new();
    for i in 0..DEFAULT_SYSTEM_COUNT {
        let id = next_id.alloc();
        system_ids.push(id);
        let angle = std::f64::consts::TAU * (i as f64) / (DEFAULT_SYSTEM_COUNT as f64);
        let radius = 200.0 + rng.gen_range(-20.0..20.0);
        systems.insert(
            id,
            StarSystem {
                id,
                name: format!("System {}", i + 1),
                galaxy_pos: Vec2::new(radius * angle.cos(), radius * angle.sin()),
                bodies: Vec::new(),
                ships: Vec::new(),
                jump_points: Vec::new(),
                region_id: Id::INVALID,
                nebula_density: rng.gen_range(0.0..0.3),
            },
        );
    }

    let region_assignment = planners::region::partition_into_regions(&systems, DEFAULT_REGION_COUNT, rng);
    let mut region_members: BTreeMap<usize, Vec<Id>> = BTreeMap::new();
    for (&sys_id, &cluster) in &region_assignment {
        region_members.entry(cluster).or_default().push(sys_id);
    }
    let mut regions = BTreeMap::new();
    let mut region_id_by_cluster = HashMap::new();
    for (cluster, members) in &region_members {
        let region_id = next_id.alloc();
        region_id_by_cluster.insert(*cluster, region_id);
        regions.insert(
            region_id,
            Region {
                id: region_id,
                name: format!("Region {}", cluster + 1),
                center: average_position(&systems, members),
                modifiers: RegionModifiers {
                    mineral_richness_mult: 1.0,
                    volatile_richness_mult: 1.0,
                    salvage_richness_mult: 1.0,
                    nebula_bias: 0.0,
                    pirate_risk: 0.1,
                    pirate_suppression: 0.0,
                    ruins_density: 0.05,
                },
            },
        );
    }
    for (&sys_id, &cluster) in &region_assignment {
        systems.get_mut(&sys_id).unwrap().region_id = region_id_by_cluster[&cluster];
    }

    let mineable_resource = content.resources.values().find(|r| r.mineable).map(|r| r.id.clone());

    let mut bodies = BTreeMap::new();
    for (i, &sys_id) in system_ids.iter().enumerate() {
        for b in 0..DEFAULT_BODIES_PER_SYSTEM {
            let body_id = next_id.alloc();
            let is_home = i == 0 && b == 0;
            let orbit = OrbitalParams {
                radius_mkm: 50.0 + 60.0 * b as f64,
                period_days: 200.0 + 100.0 * b as f64,
                phase_radians: rng.gen_range(0.0..std::f64::consts::TAU),
            };
            let mut mineral_deposits = HashMap::new();
            if !is_home {
                if let Some(resource_id) = &mineable_resource {
                    mineral_deposits.insert(resource_id.clone(), rng.gen_range(500.0..5000.0));
                }
            }
            let body = Body {
                id: body_id,
                system_id: sys_id,
                name: format!("{} {}", systems[&sys_id].name, b + 1),
                body_type: if is_home {
                    BodyType::Planet
                } else if b % 2 == 0 {
                    BodyType::Asteroid
                } else {
                    BodyType::Planet
                },
                orbit,
                position_mkm: Vec2::ZERO,
                surface_temp_k: if is_home { 288.0 } else { 150.0 + 40.0 * b as f64 },
                atmosphere_atm: if is_home { 1.0 } else { 0.0 },
                terraform_target_temp_k: None,
                terraform_target_atm: None,
                mineral_deposits,
            };
            systems.get_mut(&sys_id).unwrap().bodies.push(body_id);
            bodies.insert(body_id, body);
        }
    }
    for body in bodies.values_mut() {
        body.position_mkm = body.orbit.position_at(0.0);
    }

    let mut jump_points = BTreeMap::new();
    for i in 0..system_ids.len() {
        let a = system_ids[i];
        let b = system_ids[(i + 1) % system_ids.len()];
        if a == b {
            continue;
        }
        let jp_a = next_id.alloc();
        let jp_b = next_id.alloc();
        jump_points.insert(
            jp_a,
            JumpPoint { id: jp_a, system_id: a, position_mkm: Vec2::new(400.0, 0.0), linked_jump_id: jp_b, survey_progress: HashMap::new() },
        );
        jump_points.insert(
            jp_b,
            JumpPoint { id: jp_b, system_id: b, position_mkm: Vec2::new(-400.0, 0.0), linked_jump_id: jp_a, survey_progress: HashMap::new() },
        );
        systems.get_mut(&a).unwrap().jump_points.push(jp_a);
        systems.get_mut(&b).unwrap().jump_points.push(jp_b);
    }

    let home_system = system_ids[0];
    let home_body = systems[&home_system].bodies[0];

    let colony_id = next_id.alloc();
    let colony = Colony {
        id: colony_id,
        faction_id,
        body_id: home_body,
        population_millions: 1.0,
        stockpile: HashMap::new(),
        installations: HashMap::new(),
        shipyard_queue: Vec::new(),
        construction_queue: Vec::new(),
        ground_forces: GroundForces { troops: 100.0, fortification_points: 10.0 },
        troop_training_queue: 0.0,
        installation_targets: HashMap::new(),
    };
    let mut colonies = BTreeMap::new();
    colonies.insert(colony_id, colony);

    let design_id = content
        .designs
        .values()
        .find(|d| d.role == ShipRole::Surveyor)
        .or_else(|| content.designs.values().next())
        .map(|d| d.id.clone());

    let mut ships = BTreeMap::new();
    let mut ship_orders = BTreeMap::new();
    if let Some(design_id) = design_id {
        let stats = content.designs[&design_id].stats.clone();
        let ship_id = next_id.alloc();
        ships.insert(
            ship_id,
            Ship {
                id: ship_id,
                faction_id,
                system_id: home_system,
                position_mkm: bodies[&home_body].position_mkm,
                design_id,
                hp: stats.max_hp.max(10.0),
                shields: stats.max_shields,
                fuel: stats.fuel_capacity,
                cargo: HashMap::new(),
                troops: 0.0,
                automation: ShipAutomation::default(),
                missile_reload_remaining_days: vec![0.0; stats.missile_rack_count as usize],
            },
        );
        ship_orders.insert(ship_id, ShipOrders::default());
        systems.get_mut(&home_system).unwrap().ships.push(ship_id);
    }

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
            known_techs: BTreeSet::new(),
            unlocked_components: BTreeSet::new(),
            unlocked_installations: BTreeSet::new(),
            discovered_systems: BTreeSet::from([home_system]),
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
        selected_system: Some(home_system),
        seed,
        systems,
        bodies,
        jump_points,
        ships,
        ship_orders,
        colonies,
        factions,
        fleets: BTreeMap::new(),
        regions,
        anomalies: BTreeMap::new(),
        wrecks: BTreeMap::new(),
        contracts: BTreeMap::new(),
        events: Vec::new(),
        custom_designs: HashMap::new(),
        victory_rules: VictoryRules::default(),
        victory_state: VictoryState::default(),
    }
}

// ---------------------------------------------------------------------------
// Save/load
// ---------------------------------------------------------------------------

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("state.json");
    path.with_file_name(format!("{file_name}.tmp"))
}

/// Writes `state` via temp-sibling + rename so a crash mid-write never
/// truncates the file that was there before.
pub fn save_state_atomic(state: &GameState, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let tmp_path = sibling_tmp_path(path);
    let file = std::fs::File::create(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?;
    serde_json::to_writer_pretty(file, state).with_context(|| format!("writing {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path).with_context(|| format!("renaming {} to {}", tmp_path.display(), path.display()))?;
    Ok(())
}

/// Deserialization failure returns an error and leaves the caller's current
/// state untouched — it never mutates anything in place.
pub fn load_state(path: &Path) -> Result<GameState> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading state file: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing state file: {}", path.display()))
}

/// Loads `state_file` if given, otherwise generates a fresh game from `seed`
/// (a random one if unset).
pub fn load_or_build_state(content: &GameContent, seed: Option<u64>, state_file: Option<&str>) -> Result<(GameState, rand_chacha::ChaCha8Rng)> {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    if let Some(path) = state_file {
        let state = load_state(Path::new(path))?;
        let rng = ChaCha8Rng::seed_from_u64(state.seed);
        Ok((state, rng))
    } else {
        let resolved_seed = seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(resolved_seed);
        let state = build_initial_state(content, resolved_seed, &mut rng);
        Ok((state, rng))
    }
}

// ---------------------------------------------------------------------------
// Run directory / autosave utilities
// ---------------------------------------------------------------------------

/// Generates a timestamped run ID like `20260726_143022_seed42_a1b2c3d4`.
///
/// The trailing segment is the first 8 hex digits of a UUID drawn from
/// `rng` (seeded from the run's seed), which disambiguates two runs
/// started with the same seed in the same wall-clock second.
pub fn generate_run_id(seed: u64, rng: &mut impl Rng) -> String {
    let now = chrono::Utc::now();
    let uuid = nebula_core::generate_uuid(rng);
    let suffix = uuid.simple().to_string();
    now.format(&format!("%Y%m%d_%H%M%S_seed{seed}_{}", &suffix[..8])).to_string()
}

/// Creates the `runs/<run_id>/` directory tree, returning the path.
pub fn create_run_dir(run_id: &str) -> Result<PathBuf> {
    let dir = PathBuf::from("runs").join(run_id);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

/// Writes `run_info.json` into the run directory.
pub fn write_run_info(dir: &Path, run_id: &str, seed: u64, content_version: &str, runner_args: serde_json::Value) -> Result<()> {
    let info = serde_json::json!({
        "run_id": run_id,
        "seed": seed,
        "content_version": content_version,
        "args": runner_args,
    });
    let path = dir.join("run_info.json");
    let file = std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Autosave file name of the form `<prefix><YYYY-MM-DD>_<HH>h[.N].<ext>` —
/// no `:` character, so it stays valid on Windows filesystems.
pub fn autosave_file_name(prefix: &str, ext: &str, now: chrono::DateTime<chrono::Utc>, disambiguator: u32) -> String {
    let stamp = now.format("%Y-%m-%d_%Hh");
    if disambiguator == 0 {
        format!("{prefix}{stamp}.{ext}")
    } else {
        format!("{prefix}{stamp}.{disambiguator}.{ext}")
    }
}

/// Writes an autosave snapshot, picking the first free disambiguator if two
/// autosaves would otherwise land in the same hour.
pub fn write_autosave(dir: &Path, prefix: &str, ext: &str, state: &GameState) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating autosave directory {}", dir.display()))?;
    let now = chrono::Utc::now();
    let mut disambiguator = 0u32;
    let path = loop {
        let candidate = dir.join(autosave_file_name(prefix, ext, now, disambiguator));
        if !candidate.exists() {
            break candidate;
        }
        disambiguator += 1;
    };
    save_state_atomic(state, &path)?;
    Ok(path)
}

/// Scans `dir` for files matching `prefix`+`.ext`, sorted by mtime descending.
pub fn list_autosaves(dir: &Path, prefix: &str, ext: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let suffix = format!(".{ext}");
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else { continue };
        if !name.starts_with(prefix) || !name.ends_with(&suffix) {
            continue;
        }
        let modified = entry.metadata().and_then(|m| m.modified()).unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        entries.push((entry.path(), modified));
    }
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(entries.into_iter().map(|(p, _)| p).collect())
}

/// Deletes autosaves beyond `keep_files`, oldest first. Prune errors are
/// best-effort: collected as warning strings rather than aborting.
pub fn prune_autosaves(dir: &Path, prefix: &str, ext: &str, keep_files: usize) -> Vec<String> {
    let files = match list_autosaves(dir, prefix, ext) {
        Ok(files) => files,
        Err(e) => return vec![format!("failed to scan autosave directory: {e}")],
    };
    files
        .into_iter()
        .skip(keep_files)
        .filter_map(|path| std::fs::remove_file(&path).err().map(|e| format!("failed to prune {}: {e}", path.display())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_core::test_fixtures::base_content;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn merge_patch_overlays_objects_and_deletes_on_null() {
        let mut base = serde_json::json!({"a": 1, "b": {"x": 1, "y": 2}});
        let patch = serde_json::json!({"b": {"x": null, "z": 3}, "c": 4});
        merge_patch(&mut base, patch);
        assert_eq!(base, serde_json::json!({"a": 1, "b": {"y": 2, "z": 3}, "c": 4}));
    }

    #[test]
    fn load_content_resolves_include_chain_and_overlay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.json"),
            serde_json::json!({
                "content_version": "1.0",
                "resources": {"duranium": {"id": "duranium", "name": "Duranium", "category": "Metal", "mineable": true, "salvage_research_rp_per_ton": 0.0}},
                "components": {"engine_basic": {"id": "engine_basic", "type": "Engine", "speed_km_s": 5.0}},
                "designs": [{"id": "scout", "name": "Scout", "role": "Surveyor", "components": ["engine_basic"]}],
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("overlay.json"),
            serde_json::json!({
                "include": "base.json",
                "designs": [{"id": "scout", "name": "Scout Mk2"}],
            })
            .to_string(),
        )
        .unwrap();

        let content = load_content(&[dir.path().join("overlay.json").display().to_string()]).unwrap();
        let scout = &content.designs[&nebula_core::content::ShipDesignId::from("scout")];
        assert_eq!(scout.name, "Scout Mk2");
        assert_eq!(scout.components.len(), 1);
    }

    #[test]
    fn components_add_and_remove_patch_the_component_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("content.json"),
            serde_json::json!({
                "content_version": "1.0",
                "resources": {},
                "components": {
                    "engine_basic": {"id": "engine_basic", "type": "Engine", "speed_km_s": 5.0},
                    "cargo_hold": {"id": "cargo_hold", "type": "Cargo", "cargo_tons": 100.0},
                },
                "designs": [{
                    "id": "freighter",
                    "name": "Freighter",
                    "role": "Freighter",
                    "components": ["engine_basic"],
                    "components_add": ["cargo_hold"],
                    "components_remove": ["engine_basic"],
                }],
            })
            .to_string(),
        )
        .unwrap();

        let content = load_content(&[dir.path().join("content.json").display().to_string()]).unwrap();
        let freighter = &content.designs[&nebula_core::content::ShipDesignId::from("freighter")];
        assert_eq!(freighter.components, vec![nebula_core::content::ComponentDefId::from("cargo_hold")]);
    }

    #[test]
    fn unknown_component_reference_fails_loading() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("content.json"),
            serde_json::json!({
                "content_version": "1.0",
                "resources": {},
                "components": {},
                "designs": [{"id": "ghost", "name": "Ghost", "role": "Unknown", "components": ["nonexistent"]}],
            })
            .to_string(),
        )
        .unwrap();

        let result = load_content(&[dir.path().join("content.json").display().to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn validate_content_db_flags_key_mismatch_and_cycle() {
        let mut content = base_content();
        let bad_id = nebula_core::content::ResourceId::from("duranium");
        let mut bad_resource = content.resources.remove(&bad_id).unwrap();
        bad_resource.id = nebula_core::content::ResourceId::from("renamed");
        content.resources.insert(bad_id, bad_resource);

        content.techs.insert(
            nebula_core::content::TechDefId::from("cycle_a"),
            nebula_core::content::TechDef {
                id: nebula_core::content::TechDefId::from("cycle_a"),
                name: "A".to_string(),
                cost: 10.0,
                prereqs: vec![nebula_core::content::TechDefId::from("cycle_b")],
                effects: vec![],
            },
        );
        content.techs.insert(
            nebula_core::content::TechDefId::from("cycle_b"),
            nebula_core::content::TechDef {
                id: nebula_core::content::TechDefId::from("cycle_b"),
                name: "B".to_string(),
                cost: 10.0,
                prereqs: vec![nebula_core::content::TechDefId::from("cycle_a")],
                effects: vec![],
            },
        );

        let issues = validate_content_db(&content);
        assert!(issues.iter().any(|i| i.contains("does not match id")));
        assert!(issues.iter().any(|i| i.contains("cycle")));
    }

    #[test]
    fn build_initial_state_is_deterministic_for_a_fixed_seed() {
        let content = base_content();
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        let state1 = build_initial_state(&content, 42, &mut rng1);
        let state2 = build_initial_state(&content, 42, &mut rng2);
        assert_eq!(serde_json::to_value(&state1).unwrap(), serde_json::to_value(&state2).unwrap());
    }

    #[test]
    fn build_initial_state_has_one_colony_and_one_ship() {
        let content = base_content();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let state = build_initial_state(&content, 7, &mut rng);
        assert_eq!(state.colonies.len(), 1);
        assert_eq!(state.ships.len(), 1);
        assert_eq!(state.systems.len(), DEFAULT_SYSTEM_COUNT);
    }

    #[test]
    fn save_state_round_trips_through_atomic_write() {
        let content = base_content();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let state = build_initial_state(&content, 1, &mut rng);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        save_state_atomic(&state, &path).unwrap();
        assert!(!dir.path().join("state.json.tmp").exists());

        let loaded = load_state(&path).unwrap();
        assert_eq!(serde_json::to_value(&state).unwrap(), serde_json::to_value(&loaded).unwrap());
    }

    #[test]
    fn prune_autosaves_keeps_only_the_newest_n() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("auto_{i}.json")), "{}").unwrap();
        }
        let warnings = prune_autosaves(dir.path(), "auto_", "json", 2);
        assert!(warnings.is_empty());
        let remaining = list_autosaves(dir.path(), "auto_", "json").unwrap();
        assert_eq!(remaining.len(), 2);
    }

    #[test]
    fn split_path_list_accepts_semicolons_and_commas() {
        assert_eq!(split_path_list("a.json;b.json, c.json"), vec!["a.json", "b.json", "c.json"]);
    }
}
