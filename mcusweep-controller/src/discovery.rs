//! Target selection during a scan

use std::collections::HashSet;

use crate::link::DeviceIdentity;
use crate::store::{ProgressStore, StoreError};

/// Decides which advertising device, if any, gets engaged this run
///
/// Devices advertising any other name are remembered in the exclusion set so
/// later scans, in this run and the next, skip them without another look.
#[derive(Debug)]
pub struct DiscoveryFilter {
    target_name: String,
    excluded: HashSet<String>,
    acquired: Option<DeviceIdentity>,
}

impl DiscoveryFilter {
    pub fn new(target_name: impl Into<String>, excluded: impl IntoIterator<Item = String>) -> Self {
        Self {
            target_name: target_name.into(),
            excluded: excluded.into_iter().collect(),
            acquired: None,
        }
    }

    /// Build a filter seeded with the exclusions persisted in `store`
    pub fn load<S: ProgressStore>(target_name: impl Into<String>, store: &S) -> Result<Self, StoreError> {
        Ok(Self::new(target_name, store.load_exclusions()?))
    }

    /// True exactly once per run, for the first device advertising the target name
    pub fn should_process<S: ProgressStore>(
        &mut self,
        identity: &DeviceIdentity,
        store: &mut S,
    ) -> Result<bool, StoreError> {
        if self.excluded.contains(&identity.id) {
            return Ok(false);
        }

        if self.acquired.is_some() {
            return Ok(false);
        }

        if identity.name.as_deref() != Some(self.target_name.as_str()) {
            tracing::debug!(device = %identity, "excluding non-target device");
            store.append_exclusion(&identity.id)?;
            self.excluded.insert(identity.id.clone());
            return Ok(false);
        }

        tracing::info!(device = %identity, "target device acquired");
        self.acquired = Some(identity.clone());
        Ok(true)
    }

    pub fn acquired(&self) -> Option<&DeviceIdentity> {
        self.acquired.as_ref()
    }

    pub fn is_excluded(&self, id: &str) -> bool {
        self.excluded.contains(id)
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Store that only counts writes
    #[derive(Default)]
    struct CountingStore {
        exclusions: Vec<String>,
        appends: usize,
    }

    impl ProgressStore for CountingStore {
        fn load_exclusions(&self) -> Result<Vec<String>, StoreError> {
            Ok(self.exclusions.clone())
        }

        fn append_exclusion(&mut self, id: &str) -> Result<(), StoreError> {
            self.appends += 1;
            self.exclusions.push(id.to_string());
            Ok(())
        }

        fn load_search_value(&self) -> Result<Option<u32>, StoreError> {
            Ok(None)
        }

        fn save_search_value(&mut self, _value: u32) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn device(id: &str, name: Option<&str>) -> DeviceIdentity {
        DeviceIdentity::new(id, name)
    }

    #[test]
    fn other_names_are_excluded_once() {
        let mut store = CountingStore::default();
        let mut filter = DiscoveryFilter::new("GWL", Vec::new());

        let speaker = device("aa", Some("Speaker"));
        assert!(!filter.should_process(&speaker, &mut store).unwrap());
        assert!(!filter.should_process(&speaker, &mut store).unwrap());
        assert_eq!(store.appends, 1);
        assert_eq!(store.exclusions, vec!["aa"]);
    }

    #[test]
    fn unnamed_devices_are_excluded() {
        let mut store = CountingStore::default();
        let mut filter = DiscoveryFilter::new("GWL", Vec::new());
        assert!(!filter.should_process(&device("bb", None), &mut store).unwrap());
        assert!(filter.is_excluded("bb"));
    }

    #[test]
    fn preloaded_exclusion_never_persists() {
        let mut store = CountingStore { exclusions: vec!["cc".into()], appends: 0 };
        let mut filter = DiscoveryFilter::load("GWL", &store).unwrap();

        // even a matching name is skipped once excluded
        assert!(!filter.should_process(&device("cc", Some("GWL")), &mut store).unwrap());
        assert_eq!(store.appends, 0);
    }

    #[test]
    fn single_target_per_run() {
        let mut store = CountingStore::default();
        let mut filter = DiscoveryFilter::new("GWL", Vec::new());

        assert!(filter.should_process(&device("t1", Some("GWL")), &mut store).unwrap());
        assert!(!filter.should_process(&device("t1", Some("GWL")), &mut store).unwrap());
        assert!(!filter.should_process(&device("t2", Some("GWL")), &mut store).unwrap());
        assert!(!filter.should_process(&device("x", Some("Other")), &mut store).unwrap());

        assert_eq!(filter.acquired().map(|d| d.id.as_str()), Some("t1"));
        assert_eq!(store.appends, 0);
    }

    #[test]
    fn name_match_is_exact() {
        let mut store = CountingStore::default();
        let mut filter = DiscoveryFilter::new("GWL", Vec::new());
        assert!(!filter.should_process(&device("a", Some("GWL-2")), &mut store).unwrap());
        assert!(!filter.should_process(&device("b", Some("gwl")), &mut store).unwrap());
        assert_eq!(filter.excluded_count(), 2);
    }
}
