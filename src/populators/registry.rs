//! # Populator registry.
//!
//! Lookup table from `(IpFamily, StatusClass)` to a [`PopulatorRef`], built
//! once at startup and shared read-only (behind an `Arc`) by every reporter.
//!
//! ## Rules
//! - Immutable after [`PopulatorRegistryBuilder::build`].
//! - A missing entry is a configuration gap, not an error: the reporter skips
//!   that class for that family and keeps going.
//! - Registering the same key twice keeps the last populator.

use std::collections::HashMap;

use crate::populators::PopulatorRef;
use crate::resource::{IpFamily, StatusClass};

/// Immutable `(family, class) → populator` table.
#[derive(Clone, Default)]
pub struct PopulatorRegistry {
    entries: HashMap<(IpFamily, StatusClass), PopulatorRef>,
}

impl PopulatorRegistry {
    /// Starts building a registry.
    pub fn builder() -> PopulatorRegistryBuilder {
        PopulatorRegistryBuilder::default()
    }

    /// Returns the populator for `(family, class)`, if one is registered.
    pub fn get(&self, family: IpFamily, class: StatusClass) -> Option<&PopulatorRef> {
        self.entries.get(&(family, class))
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registered `(family, class)` pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for PopulatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort_unstable();
        f.debug_struct("PopulatorRegistry")
            .field("entries", &keys)
            .finish()
    }
}

/// Builder for [`PopulatorRegistry`].
#[derive(Default)]
pub struct PopulatorRegistryBuilder {
    entries: HashMap<(IpFamily, StatusClass), PopulatorRef>,
}

impl PopulatorRegistryBuilder {
    /// Registers `populator` for one family and class.
    #[must_use]
    pub fn register(mut self, family: IpFamily, class: StatusClass, populator: PopulatorRef) -> Self {
        self.entries.insert((family, class), populator);
        self
    }

    /// Registers the same `populator` for `class` on every family.
    ///
    /// Useful when one source answers for both families (e.g. a mock).
    #[must_use]
    pub fn register_all_families(mut self, class: StatusClass, populator: PopulatorRef) -> Self {
        for family in IpFamily::ALL {
            self.entries.insert((family, class), populator.clone());
        }
        self
    }

    /// Freezes the table.
    pub fn build(self) -> PopulatorRegistry {
        PopulatorRegistry {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populators::PopulatorFn;
    use crate::resource::NodeStatus;

    fn noop(name: &'static str) -> PopulatorRef {
        PopulatorFn::arc(name, |_: &mut NodeStatus| Ok(()))
    }

    #[test]
    fn missing_entry_is_none() {
        let reg = PopulatorRegistry::builder()
            .register(IpFamily::V4, StatusClass::Agent, noop("bird"))
            .build();

        assert!(reg.get(IpFamily::V4, StatusClass::Agent).is_some());
        assert!(reg.get(IpFamily::V6, StatusClass::Agent).is_none());
        assert!(reg.get(IpFamily::V4, StatusClass::Routes).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn all_families_share_one_populator() {
        let reg = PopulatorRegistry::builder()
            .register_all_families(StatusClass::Bgp, noop("bgp"))
            .build();

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(IpFamily::V4, StatusClass::Bgp).unwrap().name(), "bgp");
        assert_eq!(reg.get(IpFamily::V6, StatusClass::Bgp).unwrap().name(), "bgp");
    }

    #[test]
    fn last_registration_wins() {
        let reg = PopulatorRegistry::builder()
            .register(IpFamily::V4, StatusClass::Agent, noop("first"))
            .register(IpFamily::V4, StatusClass::Agent, noop("second"))
            .build();

        assert_eq!(reg.get(IpFamily::V4, StatusClass::Agent).unwrap().name(), "second");
    }
}
