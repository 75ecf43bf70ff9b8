//! Scenario-level numeric tweaks applied to a loaded `GameContent` before a
//! benchmark run starts, keyed `component.<id>.<field>` or
//! `installation.<id>.<field>`.

use std::collections::HashMap;

use anyhow::{bail, Result};
use nebula_core::content::{ComponentDefId, GameContent, InstallationDefId};

pub fn apply_overrides(content: &mut GameContent, overrides: &HashMap<String, serde_json::Value>) -> Result<()> {
    for (key, value) in overrides {
        if let Some(rest) = key.strip_prefix("component.") {
            apply_component_override(&mut content.components, rest, key, value)?;
        } else if let Some(rest) = key.strip_prefix("installation.") {
            apply_installation_override(&mut content.installations, rest, key, value)?;
        } else {
            bail!("unknown override key '{key}'. Expected component.<id>.<field> or installation.<id>.<field>");
        }
    }
    content.recompute_design_stats();
    Ok(())
}

fn apply_component_override(components: &mut HashMap<ComponentDefId, nebula_core::content::ComponentDef>, dotted: &str, full_key: &str, value: &serde_json::Value) -> Result<()> {
    let (id, field) = dotted.split_once('.').ok_or_else(|| anyhow::anyhow!("invalid override key '{full_key}': expected component.<id>.<field>"))?;
    let component_id = ComponentDefId::from(id);
    let Some(component) = components.get_mut(&component_id) else {
        bail!("override '{full_key}': no component with id '{id}'");
    };
    match field {
        "mass" => component.mass = as_f64(full_key, value)?,
        "speed_km_s" => component.speed_km_s = as_f64(full_key, value)?,
        "fuel_use_per_mkm" => component.fuel_use_per_mkm = as_f64(full_key, value)?,
        "fuel_capacity" => component.fuel_capacity = as_f64(full_key, value)?,
        "cargo_tons" => component.cargo_tons = as_f64(full_key, value)?,
        "mining_tons_per_day" => component.mining_tons_per_day = as_f64(full_key, value)?,
        "sensor_range_mkm" => component.sensor_range_mkm = as_f64(full_key, value)?,
        "signature_multiplier" => component.signature_multiplier = as_f64(full_key, value)?,
        "power_output" => component.power_output = as_f64(full_key, value)?,
        "power_use" => component.power_use = as_f64(full_key, value)?,
        "weapon_damage" => component.weapon_damage = as_f64(full_key, value)?,
        "weapon_range_mkm" => component.weapon_range_mkm = as_f64(full_key, value)?,
        "missile_damage" => component.missile_damage = as_f64(full_key, value)?,
        "missile_range_mkm" => component.missile_range_mkm = as_f64(full_key, value)?,
        "hp_bonus" => component.hp_bonus = as_f64(full_key, value)?,
        "shield_hp" => component.shield_hp = as_f64(full_key, value)?,
        "shield_regen_per_day" => component.shield_regen_per_day = as_f64(full_key, value)?,
        _ => bail!("unknown component field '{field}' in override key '{full_key}'"),
    }
    Ok(())
}

fn apply_installation_override(installations: &mut HashMap<InstallationDefId, nebula_core::content::InstallationDef>, dotted: &str, full_key: &str, value: &serde_json::Value) -> Result<()> {
    let (id, field) = dotted.split_once('.').ok_or_else(|| anyhow::anyhow!("invalid override key '{full_key}': expected installation.<id>.<field>"))?;
    let installation_id = InstallationDefId::from(id);
    let Some(installation) = installations.get_mut(&installation_id) else {
        bail!("override '{full_key}': no installation with id '{id}'");
    };
    match field {
        "construction_points_per_day" => installation.construction_points_per_day = as_f64(full_key, value)?,
        "mining_tons_per_day" => installation.mining_tons_per_day = as_f64(full_key, value)?,
        "build_rate_tons_per_day" => installation.build_rate_tons_per_day = as_f64(full_key, value)?,
        "sensor_range_mkm" => installation.sensor_range_mkm = as_f64(full_key, value)?,
        "weapon_damage" => installation.weapon_damage = as_f64(full_key, value)?,
        "weapon_range_mkm" => installation.weapon_range_mkm = as_f64(full_key, value)?,
        "research_points_per_day" => installation.research_points_per_day = as_f64(full_key, value)?,
        "terraforming_points_per_day" => installation.terraforming_points_per_day = as_f64(full_key, value)?,
        "troop_training_points_per_day" => installation.troop_training_points_per_day = as_f64(full_key, value)?,
        "habitation_capacity" => installation.habitation_capacity = as_f64(full_key, value)?,
        "fortification_points" => installation.fortification_points = as_f64(full_key, value)?,
        _ => bail!("unknown installation field '{field}' in override key '{full_key}'"),
    }
    Ok(())
}

fn as_f64(key: &str, value: &serde_json::Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| anyhow::anyhow!("override '{key}': expected a number, got {value}"))
}
