use std::collections::BTreeSet;

use healthband_algos::AlarmKind;
use strum::{Display, EnumString};

/// When the front end should sound an alarm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, clap::ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum AlertPolicy {
    /// Show alarms, never sound them.
    Silent,
    /// Sound when a new alarm appears.
    #[default]
    OnChange,
    /// Sound on every refresh while any alarm is active.
    EveryTick,
}

/// Applies an [`AlertPolicy`] to successive alarm evaluations.
#[derive(Debug, Clone, Default)]
pub struct AlertGate {
    policy: AlertPolicy,
    previous: BTreeSet<AlarmKind>,
}

impl AlertGate {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            previous: BTreeSet::new(),
        }
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }

    pub fn should_sound(&mut self, active: &BTreeSet<AlarmKind>) -> bool {
        let raised = active.difference(&self.previous).next().is_some();
        self.previous.clone_from(active);

        match self.policy {
            AlertPolicy::Silent => false,
            AlertPolicy::OnChange => raised,
            AlertPolicy::EveryTick => !active.is_empty(),
        }
    }
}
