//! Order / FleetMission tagged unions. Order execution itself lives in
//! `order_exec`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::content::ResourceId;
use crate::id::Id;
use crate::vec2::Vec2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Order {
    MoveToPoint {
        destination: Vec2,
    },
    MoveToBody {
        body_id: Id,
    },
    TravelViaJump {
        jump_id: Id,
    },
    AttackShip {
        ship_id: Id,
    },
    MineBody {
        body_id: Id,
        mineral: ResourceId,
        stop_when_cargo_full: bool,
    },
    SalvageWreck {
        wreck_id: Id,
    },
    LoadMineral {
        colony_id: Id,
        mineral: Option<ResourceId>,
        tons: f64,
    },
    UnloadMineral {
        colony_id: Id,
        mineral: Option<ResourceId>,
        tons: f64,
    },
    OrbitBody {
        body_id: Id,
        /// Negative = forever.
        duration_days: f64,
        #[serde(default)]
        elapsed_days: f64,
    },
    WaitDays {
        days: f64,
        #[serde(default)]
        elapsed_days: f64,
    },
    TransferCargoToShip {
        target_ship_id: Id,
        mineral: Option<ResourceId>,
        tons: f64,
    },
    TransferFuelToShip {
        target_ship_id: Id,
        tons: f64,
    },
    TransferTroopsToShip {
        target_ship_id: Id,
        troops: f64,
    },
    EscortShip {
        target_ship_id: Id,
    },
    SurveyJumpPoint {
        jump_id: Id,
        #[serde(default)]
        progress_days: f64,
    },
    ScrapShip {
        colony_id: Id,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuspendedOrders {
    pub queue: VecDeque<Order>,
    pub repeat: bool,
    pub repeat_template: Option<Vec<Order>>,
    pub repeat_count_remaining: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipOrders {
    pub queue: VecDeque<Order>,
    pub repeat: bool,
    pub repeat_template: Option<Vec<Order>>,
    /// -1 = infinite.
    pub repeat_count_remaining: i64,
    pub suspended: Option<SuspendedOrders>,
}

impl ShipOrders {
    pub fn suspend(&mut self) {
        let snapshot = SuspendedOrders {
            queue: std::mem::take(&mut self.queue),
            repeat: self.repeat,
            repeat_template: self.repeat_template.take(),
            repeat_count_remaining: self.repeat_count_remaining,
        };
        self.suspended = Some(snapshot);
        self.repeat = false;
    }

    pub fn resume(&mut self) {
        if let Some(s) = self.suspended.take() {
            self.queue = s.queue;
            self.repeat = s.repeat;
            self.repeat_template = s.repeat_template;
            self.repeat_count_remaining = s.repeat_count_remaining;
        }
    }

    /// Called when the queue has just emptied. Re-enqueues a deep copy of
    /// `repeat_template` and decrements the remaining-repeats counter.
    pub fn maybe_reenqueue_repeat(&mut self) {
        if !self.queue.is_empty() || !self.repeat {
            return;
        }
        if self.repeat_count_remaining == 0 {
            self.repeat = false;
            return;
        }
        if let Some(template) = &self.repeat_template {
            self.queue = template.iter().cloned().collect();
            if self.repeat_count_remaining > 0 {
                self.repeat_count_remaining -= 1;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FleetMission {
    Idle,
    PatrolSystem { system_id: Id },
    EscortShip { ship_id: Id },
    AttackSystem { system_id: Id },
    SuppressPiracy { region_id: Id },
}
