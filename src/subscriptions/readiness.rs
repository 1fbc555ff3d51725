//! Per-subscription decision from on-chain state.

use crate::ledger::types::SubscriptionStatus;

/// What the reconciler does with one subscription this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Leave it for a later tick.
    Skip,
    /// Submit `executeSubscription`.
    Execute,
    /// Drop it from the store; it can never run again.
    Remove,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Skip => "skip",
            Action::Execute => "execute",
            Action::Remove => "remove",
        }
    }
}

/// Decide the action for a subscription.
///
/// `ready` is only meaningful for active subscriptions; callers read it from
/// the chain only in that case and pass `false` otherwise.
pub fn evaluate(status: SubscriptionStatus, ready: bool) -> Action {
    match status {
        SubscriptionStatus::Active if ready => Action::Execute,
        SubscriptionStatus::Active | SubscriptionStatus::Paused => Action::Skip,
        SubscriptionStatus::Cancelled
        | SubscriptionStatus::Expired
        | SubscriptionStatus::Unknown(_) => Action::Remove,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_table() {
        assert_eq!(evaluate(SubscriptionStatus::Active, true), Action::Execute);
        assert_eq!(evaluate(SubscriptionStatus::Active, false), Action::Skip);
        assert_eq!(evaluate(SubscriptionStatus::Paused, true), Action::Skip);
        assert_eq!(evaluate(SubscriptionStatus::Paused, false), Action::Skip);
        assert_eq!(evaluate(SubscriptionStatus::Cancelled, false), Action::Remove);
        assert_eq!(evaluate(SubscriptionStatus::Expired, true), Action::Remove);
        assert_eq!(evaluate(SubscriptionStatus::Unknown(7), false), Action::Remove);
    }
}
