//! Damage assignment (MTG Rules 510.1)
//!
//! Pure functions: they read the numbers they are handed and return a plan.
//! Nothing here touches game state, so the same code serves both real
//! resolution and what-if previews.

use crate::core::{CardId, EntityRef, PlayerId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Something that can be dealt combat damage, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DamageRecipient {
    Creature(CardId),
    Player(PlayerId),
    Planeswalker(CardId),
    Battle(CardId),
}

impl DamageRecipient {
    /// The permanent behind this recipient, if it is not a player
    pub fn card(&self) -> Option<CardId> {
        match self {
            DamageRecipient::Creature(id)
            | DamageRecipient::Planeswalker(id)
            | DamageRecipient::Battle(id) => Some(*id),
            DamageRecipient::Player(_) => None,
        }
    }

    pub fn entity(&self) -> EntityRef {
        match self {
            DamageRecipient::Player(id) => EntityRef::Player(*id),
            DamageRecipient::Creature(id)
            | DamageRecipient::Planeswalker(id)
            | DamageRecipient::Battle(id) => EntityRef::Card(*id),
        }
    }
}

impl fmt::Display for DamageRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageRecipient::Creature(id) => write!(f, "creature {id}"),
            DamageRecipient::Player(id) => write!(f, "player {id}"),
            DamageRecipient::Planeswalker(id) => write!(f, "planeswalker {id}"),
            DamageRecipient::Battle(id) => write!(f, "battle {id}"),
        }
    }
}

/// What the assigner needs to know about one blocker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockerState {
    pub id: CardId,
    pub toughness: i32,
    pub damage_marked: u32,
    pub deathtouch_damaged: bool,
}

impl BlockerState {
    /// Damage this blocker still needs before it counts as lethally damaged
    ///
    /// Zero when damage from an earlier step is already lethal.
    pub fn lethal_requirement(&self, deathtouch: bool) -> u32 {
        let damage = i32::try_from(self.damage_marked).unwrap_or(i32::MAX);
        let remaining = u32::try_from(self.toughness.saturating_sub(damage)).unwrap_or(0);
        if remaining == 0 || self.deathtouch_damaged {
            0
        } else if deathtouch {
            1
        } else {
            remaining
        }
    }
}

/// How to order blockers when no explicit order was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssignmentOrder {
    /// Lowest toughness first, ties kept in declaration order
    #[default]
    AscendingToughness,
    /// Declaration order
    Declared,
}

/// Where one source's combat damage goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageAssignmentPlan {
    pub source: CardId,
    pub assignments: SmallVec<[(DamageRecipient, u32); 4]>,
    /// Deathtouch reduced at least one blocker's requirement to 1
    pub lethal_shortcut: bool,
    /// Power that could not be placed (no trample)
    pub discarded: u32,
}

impl DamageAssignmentPlan {
    pub fn empty(source: CardId) -> Self {
        DamageAssignmentPlan {
            source,
            assignments: SmallVec::new(),
            lethal_shortcut: false,
            discarded: 0,
        }
    }

    pub fn total_assigned(&self) -> u32 {
        self.assignments.iter().map(|(_, amount)| amount).sum()
    }

    pub fn amount_to(&self, recipient: DamageRecipient) -> u32 {
        self.assignments
            .iter()
            .filter(|(r, _)| *r == recipient)
            .map(|(_, amount)| amount)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    fn push(&mut self, recipient: DamageRecipient, amount: u32) {
        if amount > 0 {
            self.assignments.push((recipient, amount));
        }
    }
}

/// Inputs for planning one attacker's damage
#[derive(Debug, Clone)]
pub struct AttackerAssignment<'a> {
    pub source: CardId,
    /// Post-layer power; zero or less means no damage
    pub power: i32,
    /// Blockers still on the battlefield, in declaration order
    pub blockers: &'a [BlockerState],
    pub deathtouch: bool,
    pub trample: bool,
    /// Whether the attacker was blocked when blockers were declared
    pub blocked: bool,
    /// The player, planeswalker or battle being attacked
    pub overflow_target: DamageRecipient,
    pub order_override: Option<&'a [CardId]>,
    pub default_order: AssignmentOrder,
}

/// Plan an attacker's combat damage
///
/// A blocked creature stays blocked: if every blocker is gone it deals no
/// damage unless it has trample, in which case all of it goes to the
/// attack target.
pub fn plan_attacker_damage(input: &AttackerAssignment<'_>) -> DamageAssignmentPlan {
    let mut plan = DamageAssignmentPlan::empty(input.source);
    if input.power <= 0 {
        return plan;
    }
    let mut remaining = input.power as u32;

    if input.blockers.is_empty() {
        if !input.blocked || input.trample {
            plan.push(input.overflow_target, remaining);
        } else {
            plan.discarded = remaining;
        }
        return plan;
    }

    for blocker in order_blockers(input.blockers, input.order_override, input.default_order) {
        if remaining == 0 {
            break;
        }
        let required = blocker.lethal_requirement(input.deathtouch);
        if required == 0 {
            continue;
        }
        if input.deathtouch {
            plan.lethal_shortcut = true;
        }
        let amount = remaining.min(required);
        plan.push(DamageRecipient::Creature(blocker.id), amount);
        remaining -= amount;
    }

    if remaining > 0 {
        if input.trample {
            plan.push(input.overflow_target, remaining);
        } else {
            plan.discarded = remaining;
        }
    }
    plan
}

/// A blocker deals all its damage to the attacker it blocks
pub fn plan_blocker_damage(blocker: CardId, power: i32, attacker: CardId) -> DamageAssignmentPlan {
    let mut plan = DamageAssignmentPlan::empty(blocker);
    if power > 0 {
        plan.push(DamageRecipient::Creature(attacker), power as u32);
    }
    plan
}

/// Blockers in the order damage is assigned to them
///
/// An override lists blockers in the chosen order; blockers it omits
/// (none, once validated) follow in declaration order.
fn order_blockers<'a>(
    blockers: &'a [BlockerState],
    order_override: Option<&[CardId]>,
    default_order: AssignmentOrder,
) -> Vec<&'a BlockerState> {
    if let Some(order) = order_override {
        let mut ordered: Vec<&BlockerState> = order
            .iter()
            .filter_map(|id| blockers.iter().find(|b| b.id == *id))
            .collect();
        for blocker in blockers {
            if !order.contains(&blocker.id) {
                ordered.push(blocker);
            }
        }
        return ordered;
    }

    let mut ordered: Vec<&BlockerState> = blockers.iter().collect();
    if default_order == AssignmentOrder::AscendingToughness {
        // sort_by_key is stable, so equal toughness keeps declaration order
        ordered.sort_by_key(|b| b.toughness);
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTACKER: CardId = CardId::new(1);
    const DEFENDER: PlayerId = PlayerId::new(100);

    fn blocker(id: u32, toughness: i32) -> BlockerState {
        BlockerState {
            id: CardId::new(id),
            toughness,
            damage_marked: 0,
            deathtouch_damaged: false,
        }
    }

    fn input(power: i32, blockers: &[BlockerState]) -> AttackerAssignment<'_> {
        AttackerAssignment {
            source: ATTACKER,
            power,
            blockers,
            deathtouch: false,
            trample: false,
            blocked: !blockers.is_empty(),
            overflow_target: DamageRecipient::Player(DEFENDER),
            order_override: None,
            default_order: AssignmentOrder::AscendingToughness,
        }
    }

    fn creature(id: u32) -> DamageRecipient {
        DamageRecipient::Creature(CardId::new(id))
    }

    #[test]
    fn test_unblocked_hits_target() {
        let plan = plan_attacker_damage(&input(3, &[]));
        assert_eq!(plan.amount_to(DamageRecipient::Player(DEFENDER)), 3);

        let mut to_walker = input(4, &[]);
        to_walker.overflow_target = DamageRecipient::Planeswalker(CardId::new(50));
        let plan = plan_attacker_damage(&to_walker);
        assert_eq!(plan.assignments.as_slice(), &[(DamageRecipient::Planeswalker(CardId::new(50)), 4)]);
    }

    #[test]
    fn test_zero_power_is_empty() {
        assert!(plan_attacker_damage(&input(0, &[])).is_empty());
        assert!(plan_attacker_damage(&input(-2, &[blocker(2, 1)])).is_empty());
    }

    #[test]
    fn test_trample_overflow() {
        let blockers = [blocker(2, 2)];
        let mut trampler = input(6, &blockers);
        trampler.trample = true;
        let plan = plan_attacker_damage(&trampler);

        assert_eq!(plan.amount_to(creature(2)), 2);
        assert_eq!(plan.amount_to(DamageRecipient::Player(DEFENDER)), 4);
        assert_eq!(plan.total_assigned(), 6);
    }

    #[test]
    fn test_excess_without_trample_is_discarded() {
        let blockers = [blocker(2, 2)];
        let plan = plan_attacker_damage(&input(5, &blockers));
        assert_eq!(plan.total_assigned(), 2);
        assert_eq!(plan.discarded, 3);
    }

    #[test]
    fn test_ascending_toughness_default_order() {
        let blockers = [blocker(2, 4), blocker(3, 1), blocker(4, 2)];
        let plan = plan_attacker_damage(&input(4, &blockers));
        assert_eq!(
            plan.assignments.as_slice(),
            &[(creature(3), 1), (creature(4), 2), (creature(2), 1)]
        );
    }

    #[test]
    fn test_declared_order_and_override() {
        let blockers = [blocker(2, 4), blocker(3, 1)];
        let mut declared = input(4, &blockers);
        declared.default_order = AssignmentOrder::Declared;
        let plan = plan_attacker_damage(&declared);
        assert_eq!(plan.assignments.as_slice(), &[(creature(2), 4)]);

        let order = [CardId::new(3), CardId::new(2)];
        let mut chosen = input(4, &blockers);
        chosen.default_order = AssignmentOrder::Declared;
        chosen.order_override = Some(&order);
        let plan = plan_attacker_damage(&chosen);
        assert_eq!(plan.assignments.as_slice(), &[(creature(3), 1), (creature(2), 3)]);
    }

    #[test]
    fn test_deathtouch_needs_one_per_blocker() {
        let blockers = [blocker(2, 4), blocker(3, 4)];
        let mut deathtoucher = input(5, &blockers);
        deathtoucher.deathtouch = true;

        let plan = plan_attacker_damage(&deathtoucher);
        assert!(plan.lethal_shortcut);
        assert_eq!(plan.total_assigned(), 2);
        assert_eq!(plan.discarded, 3);

        deathtoucher.trample = true;
        let plan = plan_attacker_damage(&deathtoucher);
        assert_eq!(plan.amount_to(DamageRecipient::Player(DEFENDER)), 3);
    }

    #[test]
    fn test_deathtouch_covers_every_blocker_before_overflow() {
        let blockers = [blocker(2, 4), blocker(3, 4), blocker(4, 4)];
        let mut deathtoucher = input(5, &blockers);
        deathtoucher.deathtouch = true;
        deathtoucher.trample = true;

        let plan = plan_attacker_damage(&deathtoucher);
        assert_eq!(plan.amount_to(creature(2)), 1);
        assert_eq!(plan.amount_to(creature(3)), 1);
        assert_eq!(plan.amount_to(creature(4)), 1);
        assert_eq!(plan.amount_to(DamageRecipient::Player(DEFENDER)), 2);
    }

    #[test]
    fn test_already_lethal_blocker_is_skipped() {
        let mut hurt = blocker(2, 3);
        hurt.damage_marked = 3;
        let blockers = [hurt, blocker(3, 2)];
        let mut trampler = input(4, &blockers);
        trampler.trample = true;

        let plan = plan_attacker_damage(&trampler);
        assert_eq!(plan.amount_to(creature(2)), 0);
        assert_eq!(plan.amount_to(creature(3)), 2);
        assert_eq!(plan.amount_to(DamageRecipient::Player(DEFENDER)), 2);
    }

    #[test]
    fn test_partially_damaged_blocker_needs_remaining_toughness() {
        let mut hurt = blocker(2, 5);
        hurt.damage_marked = 3;
        let blockers = [hurt];
        let mut trampler = input(4, &blockers);
        trampler.trample = true;

        let plan = plan_attacker_damage(&trampler);
        assert_eq!(plan.amount_to(creature(2)), 2);
        assert_eq!(plan.amount_to(DamageRecipient::Player(DEFENDER)), 2);
    }

    #[test]
    fn test_huge_marked_damage_counts_as_lethal() {
        let mut buried = blocker(2, 5);
        buried.damage_marked = u32::MAX;
        assert_eq!(buried.lethal_requirement(false), 0);

        let blockers = [buried];
        let mut trampler = input(4, &blockers);
        trampler.trample = true;
        let plan = plan_attacker_damage(&trampler);
        assert_eq!(plan.amount_to(creature(2)), 0);
        assert_eq!(plan.amount_to(DamageRecipient::Player(DEFENDER)), 4);
    }

    #[test]
    fn test_blocked_attacker_without_blockers() {
        let mut stays_blocked = input(3, &[]);
        stays_blocked.blocked = true;
        let plan = plan_attacker_damage(&stays_blocked);
        assert!(plan.is_empty());
        assert_eq!(plan.discarded, 3);

        stays_blocked.trample = true;
        let plan = plan_attacker_damage(&stays_blocked);
        assert_eq!(plan.amount_to(DamageRecipient::Player(DEFENDER)), 3);
    }

    #[test]
    fn test_blocker_plan() {
        let plan = plan_blocker_damage(CardId::new(2), 3, ATTACKER);
        assert_eq!(plan.assignments.as_slice(), &[(DamageRecipient::Creature(ATTACKER), 3)]);
        assert!(plan_blocker_damage(CardId::new(2), 0, ATTACKER).is_empty());
    }
}
