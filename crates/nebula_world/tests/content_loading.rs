//! Integration tests for the include/overlay JSON merge-patch content
//! pipeline: load_content's include chains, design components_add/remove
//! overlays, cycle detection, unknown-reference failures, and
//! validate_content_db's non-fatal issue list.

use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, body: &serde_json::Value) -> String {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(body).unwrap()).unwrap();
    path.to_str().unwrap().to_string()
}

fn base_body() -> serde_json::Value {
    serde_json::json!({
        "content_version": "test-1",
        "resources": {
            "duranium": {
                "id": "duranium",
                "name": "Duranium",
                "category": "Metal",
                "mineable": true,
                "salvage_research_rp_per_ton": 0.0
            }
        },
        "components": {
            "engine_basic": { "id": "engine_basic", "name": "Basic Engine", "type": "Engine", "speed_km_s": 5.0 },
            "sensor_basic": { "id": "sensor_basic", "name": "Basic Sensor", "type": "Sensor", "sensor_range_mkm": 50.0 },
            "cargo_hold": { "id": "cargo_hold", "name": "Cargo Hold", "type": "Cargo", "cargo_tons": 200.0 }
        },
        "designs": [
            {
                "id": "surveyor_mk1",
                "name": "Surveyor Mk1",
                "role": "Surveyor",
                "components": ["engine_basic", "sensor_basic"]
            }
        ]
    })
}

#[test]
fn load_content_resolves_include_chain_and_overlays_designs() {
    let dir = TempDir::new().unwrap();
    write(&dir, "base.json", &base_body());

    let overlay = serde_json::json!({
        "include": "base.json",
        "designs": {
            "surveyor_mk1": {
                "components_add": ["cargo_hold"]
            }
        }
    });
    let overlay_path = write(&dir, "overlay.json", &overlay);

    let content = nebula_world::load_content(&[overlay_path]).unwrap();
    assert_eq!(content.content_version, "test-1");
    let design = &content.designs[&nebula_core::content::ShipDesignId::from("surveyor_mk1")];
    assert_eq!(design.components.len(), 3);
    assert!(design.stats.cargo_tons > 0.0, "recompute_design_stats should have run");
}

#[test]
fn load_content_components_remove_strips_overlaid_component() {
    let dir = TempDir::new().unwrap();
    write(&dir, "base.json", &base_body());

    let overlay = serde_json::json!({
        "include": "base.json",
        "designs": {
            "surveyor_mk1": {
                "components_remove": ["sensor_basic"]
            }
        }
    });
    let overlay_path = write(&dir, "overlay.json", &overlay);

    let content = nebula_world::load_content(&[overlay_path]).unwrap();
    let design = &content.designs[&nebula_core::content::ShipDesignId::from("surveyor_mk1")];
    assert_eq!(design.components, vec![nebula_core::content::ComponentDefId::from("engine_basic")]);
}

#[test]
fn load_content_null_patch_value_deletes_key() {
    let dir = TempDir::new().unwrap();
    write(&dir, "base.json", &base_body());

    let overlay = serde_json::json!({
        "include": "base.json",
        "resources": {
            "duranium": null
        }
    });
    let overlay_path = write(&dir, "overlay.json", &overlay);

    let content = nebula_world::load_content(&[overlay_path]).unwrap();
    assert!(!content.resources.contains_key(&nebula_core::content::ResourceId::from("duranium")));
}

#[test]
fn load_content_detects_include_cycles() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.json", &serde_json::json!({ "include": "b.json" }));
    let a_path = dir.path().join("a.json").to_str().unwrap().to_string();
    write(&dir, "b.json", &serde_json::json!({ "include": "a.json" }));

    let err = nebula_world::load_content(&[a_path]).unwrap_err();
    assert!(err.to_string().contains("include cycle"));
}

#[test]
fn load_content_rejects_design_with_unknown_component() {
    let dir = TempDir::new().unwrap();
    let mut body = base_body();
    body["designs"][0]["components"] = serde_json::json!(["engine_basic", "no_such_component"]);
    let path = write(&dir, "base.json", &body);

    let err = nebula_world::load_content(&[path]).unwrap_err();
    assert!(err.to_string().contains("no_such_component"));
}

#[test]
fn load_all_content_merges_separate_tech_files() {
    let dir = TempDir::new().unwrap();
    let content_path = write(&dir, "base.json", &base_body());

    let techs = serde_json::json!({
        "techs": {
            "tech_deep_scan_v1": {
                "id": "tech_deep_scan_v1",
                "name": "Deep Scan I",
                "cost": 100.0,
                "prereqs": [],
                "effects": [{ "type": "UnlockComponent", "value": "sensor_basic" }]
            }
        }
    });
    let tech_path = write(&dir, "techs.json", &techs);

    let content = nebula_world::load_all_content(&[content_path], &[tech_path]).unwrap();
    assert!(content.techs.contains_key(&nebula_core::content::TechDefId::from("tech_deep_scan_v1")));
}

#[test]
fn validate_content_db_flags_unknown_cross_references_and_prereq_cycles() {
    use nebula_core::content::{GameContent, TechDef, TechDefId, TechEffect};

    let mut content = GameContent {
        content_version: "test".to_string(),
        ..Default::default()
    };
    content.techs.insert(
        TechDefId::from("tech_a"),
        TechDef {
            id: TechDefId::from("tech_a"),
            name: "A".to_string(),
            cost: 10.0,
            prereqs: vec![TechDefId::from("tech_b")],
            effects: vec![TechEffect::UnlockComponent {
                value: "missing_component".to_string(),
            }],
        },
    );
    content.techs.insert(
        TechDefId::from("tech_b"),
        TechDef {
            id: TechDefId::from("tech_b"),
            name: "B".to_string(),
            cost: 10.0,
            prereqs: vec![TechDefId::from("tech_a")],
            effects: Vec::new(),
        },
    );

    let issues = nebula_world::validate_content_db(&content);
    assert!(issues.iter().any(|i| i.contains("unlocks unknown component")));
    assert!(issues.iter().any(|i| i.contains("prereq cycle")));
}

#[test]
fn split_path_list_accepts_semicolon_and_comma_separators() {
    let paths = nebula_world::split_path_list(" a.json ,b.json ; c.json");
    assert_eq!(paths, vec!["a.json", "b.json", "c.json"]);
}
