//! Closed-form pursuit-intercept solver.
//!
//! Ground truth: `examples/original_source/include/nebula4x/core/intercept.h`.
//! Given pursuer position `p` and speed `s`, and a target at `target` moving
//! at constant velocity `v`, find the smallest `t >= 0` such that
//! `|target + v*t - p| <= r + s*t`, i.e. the pursuer (closing at its own
//! speed on a straight aim vector) can reach a point within `r` of the
//! target's future position by time `t`.

use crate::vec2::Vec2;

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterceptAim {
    pub has_solution: bool,
    pub solution_time_days: f64,
    pub aim_position: Vec2,
    pub clamped: bool,
}

impl InterceptAim {
    fn none() -> Self {
        InterceptAim {
            has_solution: false,
            solution_time_days: 0.0,
            aim_position: Vec2::ZERO,
            clamped: false,
        }
    }
}

/// `r` is the desired closing range (0 for a rendezvous, weapon range for
/// combat). `max_lead` caps how far into the future the aim point may be
/// projected; beyond it the aim clamps to the position at `max_lead`.
pub fn compute_intercept_aim(p: Vec2, s: f64, target: Vec2, v: Vec2, r: f64, max_lead: f64) -> InterceptAim {
    if s <= EPS {
        return InterceptAim::none();
    }

    let d = target.sub(p);
    if d.length() <= r {
        return InterceptAim {
            has_solution: true,
            solution_time_days: 0.0,
            aim_position: target,
            clamped: false,
        };
    }

    let a = v.length_sq() - s * s;
    let b = 2.0 * (d.dot(v) - s * r);
    let c = d.length_sq() - r * r;

    let t = if a.abs() <= EPS {
        // Linear case: bt + c = 0.
        if b.abs() <= EPS {
            return InterceptAim::none();
        }
        let t = -c / b;
        if t < 0.0 {
            return InterceptAim::none();
        }
        t
    } else {
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return InterceptAim::none();
        }
        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);
        let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        if hi < 0.0 {
            return InterceptAim::none();
        }
        if lo >= 0.0 {
            lo
        } else {
            hi
        }
    };

    if !t.is_finite() {
        return InterceptAim::none();
    }

    let (t, clamped) = if t > max_lead {
        (max_lead, true)
    } else {
        (t, false)
    };

    let aim_position = target.add(v.scale(t));
    if !aim_position.x.is_finite() || !aim_position.y.is_finite() {
        return InterceptAim::none();
    }

    InterceptAim {
        has_solution: true,
        solution_time_days: t,
        aim_position,
        clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stationary_target_closed_form() {
        let aim = compute_intercept_aim(Vec2::new(0.0, 0.0), 10.0, Vec2::new(10.0, 0.0), Vec2::ZERO, 2.0, 1000.0);
        assert!(aim.has_solution);
        assert!((aim.solution_time_days - 0.8).abs() < 1e-6);
        assert!((aim.aim_position.x - 10.0).abs() < 1e-6);
        assert!((aim.aim_position.y - 0.0).abs() < 1e-6);
    }

    #[test]
    fn zero_speed_has_no_solution() {
        let aim = compute_intercept_aim(Vec2::ZERO, 0.0, Vec2::new(10.0, 0.0), Vec2::ZERO, 2.0, 1000.0);
        assert!(!aim.has_solution);
    }

    #[test]
    fn already_within_range_is_immediate() {
        let aim = compute_intercept_aim(Vec2::ZERO, 10.0, Vec2::new(1.0, 0.0), Vec2::ZERO, 2.0, 1000.0);
        assert!(aim.has_solution);
        assert_eq!(aim.solution_time_days, 0.0);
        assert_eq!(aim.aim_position, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn target_outrunning_pursuer_has_no_solution() {
        // Target moving directly away faster than the pursuer can close.
        let aim = compute_intercept_aim(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0), 0.0, 1000.0);
        assert!(!aim.has_solution);
    }

    #[test]
    fn lead_beyond_max_is_clamped() {
        // Pursuer is faster than the receding target (2.5 days to catch),
        // but max_lead caps the aim projection at 0.5 days.
        let aim = compute_intercept_aim(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), Vec2::new(1.0, 0.0), 0.0, 0.5);
        assert!(aim.has_solution);
        assert!(aim.clamped);
        assert!((aim.solution_time_days - 0.5).abs() < 1e-9);
        assert_eq!(aim.aim_position, Vec2::new(10.5, 0.0));
    }
}
