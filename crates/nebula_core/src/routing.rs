//! Jump-graph route planning.
//!
//! Dijkstra over a graph whose nodes are jump points: flying within a system
//! from one jump point to another costs `distance/speed`; using a jump point
//! (teleporting to its `linked_jump_id`) costs zero. A virtual start node
//! connects to every jump point in the origin system at `dist(start, jp)/speed`;
//! a virtual end node is reached from every jump point in the destination
//! system at `dist(jp, dest_pos)/speed`.

use std::collections::BTreeSet;

use crate::id::Id;
use crate::state::{JumpPoint, StarSystem};
use crate::vec2::Vec2;

#[derive(Debug, Clone, PartialEq)]
pub struct JumpRoute {
    pub jump_ids: Vec<Id>,
    pub eta_days: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Start,
    End,
    Jump(Id),
}

pub struct RoutingContext<'a> {
    pub systems: &'a std::collections::BTreeMap<Id, StarSystem>,
    pub jump_points: &'a std::collections::BTreeMap<Id, JumpPoint>,
}

#[allow(clippy::too_many_arguments)]
pub fn plan_jump_route(
    ctx: &RoutingContext,
    origin_system: Id,
    origin_pos: Vec2,
    speed_mkm_per_day: f64,
    dest_system: Id,
    dest_pos: Vec2,
    restrict_to_discovered: Option<&BTreeSet<Id>>,
) -> Option<JumpRoute> {
    if speed_mkm_per_day <= 0.0 {
        return None;
    }

    if origin_system == dest_system {
        let direct = origin_pos.distance(dest_pos) / speed_mkm_per_day;
        return Some(JumpRoute {
            jump_ids: Vec::new(),
            eta_days: direct,
        });
    }

    let discovered_ok = |system_id: Id| -> bool {
        match restrict_to_discovered {
            Some(set) => set.contains(&system_id),
            None => true,
        }
    };
    if !discovered_ok(dest_system) {
        return None;
    }

    // Dijkstra with O(V^2) extraction — system counts in this game are small.
    let mut dist: std::collections::HashMap<Node, f64> = std::collections::HashMap::new();
    let mut prev: std::collections::HashMap<Node, (Node, Option<Id>)> = std::collections::HashMap::new();
    let mut visited: BTreeSet<Node> = BTreeSet::new();

    dist.insert(Node::Start, 0.0);

    loop {
        let Some((&u, &d)) = dist.iter().filter(|(n, _)| !visited.contains(n)).min_by(|a, b| a.1.total_cmp(b.1)) else {
            break;
        };
        if u == Node::End {
            break;
        }
        visited.insert(u);

        let mut relax = |v: Node, cost: f64, via_jump: Option<Id>| {
            let nd = d + cost;
            let better = dist.get(&v).map(|&cur| nd < cur).unwrap_or(true);
            if better {
                dist.insert(v, nd);
                prev.insert(v, (u, via_jump));
            }
        };

        match u {
            Node::Start => {
                if let Some(sys) = ctx.systems.get(&origin_system) {
                    for &jp_id in &sys.jump_points {
                        if let Some(jp) = ctx.jump_points.get(&jp_id) {
                            let cost = origin_pos.distance(jp.position_mkm) / speed_mkm_per_day;
                            relax(Node::Jump(jp_id), cost, None);
                        }
                    }
                }
            }
            Node::Jump(jp_id) => {
                let Some(jp) = ctx.jump_points.get(&jp_id) else {
                    continue;
                };
                // Teleport through this jump point (zero-cost) if its link target system
                // is reachable under the discovery restriction.
                if jp.linked_jump_id.is_valid() {
                    if let Some(linked) = ctx.jump_points.get(&jp.linked_jump_id) {
                        if discovered_ok(linked.system_id) {
                            relax(Node::Jump(jp.linked_jump_id), 0.0, Some(jp_id));
                        }
                    }
                }
                // Fly onward to another jump point in this same system.
                if let Some(sys) = ctx.systems.get(&jp.system_id) {
                    for &other_id in &sys.jump_points {
                        if other_id == jp_id {
                            continue;
                        }
                        if let Some(other) = ctx.jump_points.get(&other_id) {
                            let cost = jp.position_mkm.distance(other.position_mkm) / speed_mkm_per_day;
                            relax(Node::Jump(other_id), cost, None);
                        }
                    }
                    // Reach the destination from here if we're in the target system.
                    if jp.system_id == dest_system {
                        let cost = jp.position_mkm.distance(dest_pos) / speed_mkm_per_day;
                        relax(Node::End, cost, None);
                    }
                }
            }
            Node::End => {}
        }
    }

    let eta = *dist.get(&Node::End)?;

    // Walk `prev` back from End, collecting the jump ids actually transited
    // (only `Some(jp_id)` steps are real jump-point uses).
    let mut jump_ids = Vec::new();
    let mut cur = Node::End;
    while let Some(&(p, via)) = prev.get(&cur) {
        if let Some(jp) = via {
            jump_ids.push(jp);
        }
        cur = p;
        if cur == Node::Start {
            break;
        }
    }
    jump_ids.reverse();

    Some(JumpRoute { jump_ids, eta_days: eta })
}
