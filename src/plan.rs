//! Roll plan construction.
//!
//! A plan is built once from the session parameters and never mutated.
//! Building is a pure function: identical inputs always produce an
//! identical plan.

/// Maximum boost uses spent in a single `$us` command.
pub const MAX_BOOST_CHUNK: u32 = 20;

/// What a single plan entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// One roll command (text or slash, decided at execution time).
    Roll,
    /// One boost command spending `amount` uses.
    Boost { amount: u32 },
    /// Terminal bookkeeping entry. Never sent to the transport.
    Sentinel,
}

/// One entry of a roll plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    /// Position within the plan, fixed at construction.
    pub index: usize,
}

/// Immutable ordered action sequence for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollPlan {
    actions: Vec<Action>,
}

impl RollPlan {
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Build the ordered action sequence for a session.
///
/// Emits `roll_count` standalone rolls, then partitions `boost_total` into
/// chunks of at most `boost_chunk_max` uses (last chunk may be smaller),
/// emitting one boost followed by one roll per chunk, and closes the plan
/// with a sentinel.
pub fn build(roll_count: u32, boost_total: u32, boost_chunk_max: u32) -> RollPlan {
    debug_assert!(boost_chunk_max > 0);
    let mut actions = Vec::new();
    let mut push = |actions: &mut Vec<Action>, kind: ActionKind| {
        let index = actions.len();
        actions.push(Action { kind, index });
    };

    for _ in 0..roll_count {
        push(&mut actions, ActionKind::Roll);
    }

    let mut remaining = boost_total;
    while remaining > 0 {
        let amount = remaining.min(boost_chunk_max);
        push(&mut actions, ActionKind::Boost { amount });
        push(&mut actions, ActionKind::Roll);
        remaining -= amount;
    }

    push(&mut actions, ActionKind::Sentinel);
    RollPlan { actions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(plan: &RollPlan) -> Vec<ActionKind> {
        plan.actions().iter().map(|a| a.kind).collect()
    }

    #[test]
    fn build_is_deterministic() {
        assert_eq!(build(5, 45, MAX_BOOST_CHUNK), build(5, 45, MAX_BOOST_CHUNK));
        assert_eq!(build(0, 0, MAX_BOOST_CHUNK), build(0, 0, MAX_BOOST_CHUNK));
    }

    #[test]
    fn build_partitions_boosts_into_chunks() {
        let plan = build(5, 45, MAX_BOOST_CHUNK);
        let expected = [
            ActionKind::Roll,
            ActionKind::Roll,
            ActionKind::Roll,
            ActionKind::Roll,
            ActionKind::Roll,
            ActionKind::Boost { amount: 20 },
            ActionKind::Roll,
            ActionKind::Boost { amount: 20 },
            ActionKind::Roll,
            ActionKind::Boost { amount: 5 },
            ActionKind::Roll,
            ActionKind::Sentinel,
        ];
        assert_eq!(kinds(&plan), expected);
    }

    #[test]
    fn build_single_full_chunk_is_not_split() {
        let plan = build(0, 20, MAX_BOOST_CHUNK);
        assert_eq!(
            kinds(&plan),
            [
                ActionKind::Boost { amount: 20 },
                ActionKind::Roll,
                ActionKind::Sentinel,
            ]
        );
    }

    #[test]
    fn build_empty_plan_is_just_the_sentinel() {
        let plan = build(0, 0, MAX_BOOST_CHUNK);
        assert_eq!(kinds(&plan), [ActionKind::Sentinel]);
        assert_eq!(plan.len(), 1);
        assert!(!plan.is_empty());
    }

    #[test]
    fn build_indexes_are_sequential() {
        let plan = build(3, 25, MAX_BOOST_CHUNK);
        for (i, action) in plan.actions().iter().enumerate() {
            assert_eq!(action.index, i);
        }
    }

    #[test]
    fn build_respects_custom_chunk_size() {
        let plan = build(0, 7, 3);
        assert_eq!(
            kinds(&plan),
            [
                ActionKind::Boost { amount: 3 },
                ActionKind::Roll,
                ActionKind::Boost { amount: 3 },
                ActionKind::Roll,
                ActionKind::Boost { amount: 1 },
                ActionKind::Roll,
                ActionKind::Sentinel,
            ]
        );
    }
}
