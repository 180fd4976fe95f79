//! Per-user cost aggregates assembled once per batch.

use std::collections::HashMap;

use uuid::Uuid;

use super::compare::costs_differ;

/// One user's cost position before and after a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UserCostSnapshot {
    /// Sum of in-scope cached costs before this pass.
    pub previous: f64,
    /// Sum of live costs for this pass, carrying the cached value for
    /// workspaces that were not refreshed or whose live cost is unknown.
    pub live: f64,
}

impl UserCostSnapshot {
    /// The cost used for limit and threshold checks.
    ///
    /// The live sum can undercount when only part of a user's
    /// workspaces were refreshed, and the cached sum lags behind live
    /// spend; taking the max never understates usage.
    pub fn current(&self) -> f64 {
        self.previous.max(self.live)
    }
}

/// Aggregated cost view over one reconciliation batch.
///
/// Built by the reconciler, consumed by the alert engine and the status
/// controller. Passed by value between pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct AggregateCostView {
    per_user: HashMap<Uuid, UserCostSnapshot>,
}

impl AggregateCostView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_previous(&mut self, user_id: Uuid, cost: f64) {
        self.per_user.entry(user_id).or_default().previous += cost;
    }

    pub fn add_live(&mut self, user_id: Uuid, cost: f64) {
        self.per_user.entry(user_id).or_default().live += cost;
    }

    pub fn snapshot(&self, user_id: Uuid) -> Option<UserCostSnapshot> {
        self.per_user.get(&user_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.per_user.is_empty()
    }

    /// Users whose cached and live aggregates differ beyond tolerance.
    /// Only these can cross a threshold or the limit this pass.
    pub fn changed_users(&self) -> Vec<Uuid> {
        let mut users: Vec<Uuid> = self
            .per_user
            .iter()
            .filter(|(_, snap)| costs_differ(snap.previous, snap.live))
            .map(|(id, _)| *id)
            .collect();
        users.sort();
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_is_max_of_previous_and_live() {
        let snap = UserCostSnapshot {
            previous: 120.0,
            live: 80.0,
        };
        assert_eq!(snap.current(), 120.0);

        let snap = UserCostSnapshot {
            previous: 80.0,
            live: 120.0,
        };
        assert_eq!(snap.current(), 120.0);
    }

    #[test]
    fn test_changed_users_respects_tolerance() {
        let mut view = AggregateCostView::new();
        let changed = Uuid::new_v4();
        let unchanged = Uuid::new_v4();

        view.add_previous(changed, 10.0);
        view.add_live(changed, 12.0);

        view.add_previous(unchanged, 10.0);
        view.add_live(unchanged, 10.0 + 1e-9);

        assert_eq!(view.changed_users(), vec![changed]);
    }

    #[test]
    fn test_aggregates_sum_across_workspaces() {
        let mut view = AggregateCostView::new();
        let user = Uuid::new_v4();

        view.add_previous(user, 10.0);
        view.add_previous(user, 5.0);
        view.add_live(user, 20.0);

        let snap = view.snapshot(user).unwrap();
        assert_eq!(snap.previous, 15.0);
        assert_eq!(snap.live, 20.0);
        assert_eq!(snap.current(), 20.0);
    }
}
