//! Test catalog and the active (negotiated) subset of it.

use crate::bitmap::TestBitmap;
use crate::error::{Error, Result};
use std::collections::HashSet;

/// One selectable regression test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDescriptor {
    pub name: String,
    bit: TestBitmap,
    pub enabled: bool,
    /// Entry point handed to the test framework, e.g. `file.py:Class.method`.
    pub target: String,
    /// Presumed true until the run log shows the test passing.
    pub failed: bool,
}

impl TestDescriptor {
    pub fn new(name: impl Into<String>, bit: u32, enabled: bool, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bit: TestBitmap::from_bits(bit),
            enabled,
            target: target.into(),
            failed: true,
        }
    }

    pub const fn bit(&self) -> TestBitmap {
        self.bit
    }
}

//                 NAME                        ID    ENABLED  TARGET
const CATALOG: &[(&str, u32, bool, &str)] = &[
    ("NvmeTestNvmeInit", 0x01, true, "test_nvme_admin.py:TestNvmeAdmin.test_init"),
    ("NvmeTestAdminCmds", 0x02, false, "test_nvme_admin.py:TestNvmeAdmin.test_admin_cmds"),
    ("NvmeTestRandDataXfer", 0x04, true, "test_nvme_io.py:TestNvmeIo.test_rand_data_xfer"),
    ("NvmeTestBulkDataXfer", 0x08, true, "test_nvme_io.py:TestNvmeIo.test_bulk_data_xfer"),
    ("NvmeTestWriteZeros", 0x10, false, "test_nvme_io.py:TestNvmeIo.test_write_zeros"),
    ("NvmeTestDataCompare", 0x20, false, "test_nvme_io.py:TestNvmeIo.test_data_compare"),
    ("NvmeTestBulkDataXfer128K", 0x40, true, "test_nvme_io.py:TestNvmeIo.test_bulk_data_xfer_128k"),
];

/// Ordered catalog plus the active subset selected for this run.
///
/// The active subset starts as the enabled descriptors and only ever
/// shrinks; it always keeps catalog order.
#[derive(Debug, Clone)]
pub struct TestRegistry {
    tests: Vec<TestDescriptor>,
    active: Vec<usize>,
}

impl TestRegistry {
    /// Build a registry, rejecting bits that are zero, multi-bit or shared,
    /// and names that repeat.
    pub fn new(tests: Vec<TestDescriptor>) -> Result<Self> {
        let mut seen_bits = TestBitmap::EMPTY;
        let mut seen_names = HashSet::new();
        for test in &tests {
            if !test.bit.is_single() {
                return Err(Error::registry(format!(
                    "{} has id {}, which is not a single bit",
                    test.name, test.bit
                )));
            }
            if seen_bits.intersects(test.bit) {
                return Err(Error::registry(format!(
                    "{} reuses id {}",
                    test.name, test.bit
                )));
            }
            if !seen_names.insert(test.name.as_str()) {
                return Err(Error::registry(format!("duplicate test name {}", test.name)));
            }
            seen_bits |= test.bit;
        }

        let active = tests
            .iter()
            .enumerate()
            .filter(|(_, test)| test.enabled)
            .map(|(idx, _)| idx)
            .collect();
        Ok(Self { tests, active })
    }

    /// The built-in NVMe catalog.
    pub fn builtin() -> Self {
        let tests = CATALOG
            .iter()
            .map(|&(name, bit, enabled, target)| TestDescriptor::new(name, bit, enabled, target))
            .collect();
        Self::new(tests).expect("builtin catalog has unique single-bit ids")
    }

    /// Replace the catalog's enabled flags with an explicit list of names.
    /// Unknown names are an error so typos don't silently disable a run.
    pub fn enable_only<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        for name in names {
            if !self.tests.iter().any(|t| t.name == name.as_ref()) {
                return Err(Error::config(format!("unknown test name {}", name.as_ref())));
            }
        }
        for test in &mut self.tests {
            test.enabled = names.iter().any(|n| n.as_ref() == test.name);
        }
        self.active = self
            .tests
            .iter()
            .enumerate()
            .filter(|(_, test)| test.enabled)
            .map(|(idx, _)| idx)
            .collect();
        Ok(())
    }

    /// Every descriptor in catalog order.
    pub fn all(&self) -> &[TestDescriptor] {
        &self.tests
    }

    pub fn active(&self) -> impl Iterator<Item = &TestDescriptor> {
        self.active.iter().map(|&idx| &self.tests[idx])
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Union of the bits of every enabled descriptor.
    pub fn enabled_bitmap(&self) -> TestBitmap {
        self.tests
            .iter()
            .filter(|t| t.enabled)
            .map(TestDescriptor::bit)
            .collect()
    }

    /// Union of the bits of the active set.
    pub fn active_bitmap(&self) -> TestBitmap {
        self.active().map(TestDescriptor::bit).collect()
    }

    /// Union of the bits of active descriptors still marked failed.
    pub fn failure_bitmap(&self) -> TestBitmap {
        self.active()
            .filter(|t| t.failed)
            .map(TestDescriptor::bit)
            .collect()
    }

    /// Keep only active descriptors whose bit intersects `selected`.
    pub fn retain_active(&mut self, selected: TestBitmap) {
        let tests = &self.tests;
        self.active
            .retain(|&idx| tests[idx].bit.intersects(selected));
    }

    /// Look up an active descriptor by exact name.
    pub fn active_by_name(&self, name: &str) -> Option<&TestDescriptor> {
        self.active().find(|t| t.name == name)
    }

    pub fn active_by_name_mut(&mut self, name: &str) -> Option<&mut TestDescriptor> {
        let idx = self
            .active
            .iter()
            .copied()
            .find(|&idx| self.tests[idx].name == name)?;
        Some(&mut self.tests[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(registry: &TestRegistry) -> Vec<&str> {
        registry.active().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn builtin_catalog_starts_with_enabled_tests_active() {
        let registry = TestRegistry::builtin();
        assert_eq!(registry.all().len(), 7);
        assert_eq!(
            names(&registry),
            vec![
                "NvmeTestNvmeInit",
                "NvmeTestRandDataXfer",
                "NvmeTestBulkDataXfer",
                "NvmeTestBulkDataXfer128K"
            ]
        );
        assert_eq!(registry.enabled_bitmap().bits(), 0x4d);
        assert!(registry.all().iter().all(|t| t.failed));
    }

    #[test]
    fn rejects_multi_bit_ids() {
        let err = TestRegistry::new(vec![TestDescriptor::new("a", 0x3, true, "t")]).unwrap_err();
        assert!(err.to_string().contains("not a single bit"));
    }

    #[test]
    fn rejects_zero_id() {
        assert!(TestRegistry::new(vec![TestDescriptor::new("a", 0, true, "t")]).is_err());
    }

    #[test]
    fn rejects_shared_bits() {
        let err = TestRegistry::new(vec![
            TestDescriptor::new("a", 0x2, true, "t"),
            TestDescriptor::new("b", 0x2, false, "t"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("reuses id 0x2"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = TestRegistry::new(vec![
            TestDescriptor::new("a", 0x1, true, "t"),
            TestDescriptor::new("a", 0x2, true, "t"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate test name"));
    }

    #[test]
    fn retain_active_keeps_catalog_order() {
        let mut registry = TestRegistry::builtin();
        registry.retain_active(TestBitmap::from_bits(0x40 | 0x01));
        assert_eq!(names(&registry), vec!["NvmeTestNvmeInit", "NvmeTestBulkDataXfer128K"]);
        assert_eq!(registry.active_bitmap().bits(), 0x41);
    }

    #[test]
    fn failure_bitmap_only_counts_active_tests() {
        let mut registry = TestRegistry::builtin();
        registry.retain_active(TestBitmap::from_bits(0x04));
        registry
            .active_by_name_mut("NvmeTestRandDataXfer")
            .unwrap()
            .failed = false;
        assert_eq!(registry.failure_bitmap(), TestBitmap::EMPTY);
        assert!(registry.active_by_name_mut("NvmeTestNvmeInit").is_none());
    }

    #[test]
    fn enable_only_overrides_catalog_flags() {
        let mut registry = TestRegistry::builtin();
        registry
            .enable_only(&["NvmeTestWriteZeros", "NvmeTestNvmeInit"])
            .unwrap();
        assert_eq!(names(&registry), vec!["NvmeTestNvmeInit", "NvmeTestWriteZeros"]);
        assert_eq!(registry.enabled_bitmap().bits(), 0x11);
    }

    #[test]
    fn enable_only_rejects_unknown_names() {
        let mut registry = TestRegistry::builtin();
        assert!(registry.enable_only(&["NoSuchTest"]).is_err());
        assert_eq!(registry.active_len(), 4);
    }
}
