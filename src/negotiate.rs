//! Test negotiation with the device.

use crate::bitmap::TestBitmap;
use crate::device::DeviceCli;
use crate::registry::TestRegistry;

/// Narrow the registry's active set to the enabled tests the device
/// supports.
///
/// Returns `false`, leaving the registry untouched, when nothing is enabled,
/// the device supports none of the request, or its answer is unusable.
pub fn negotiate(registry: &mut TestRegistry, device: &DeviceCli<'_>) -> bool {
    let requested = registry.enabled_bitmap();
    let supported = device.query_tests(requested);
    let selected = requested & supported;

    let extra = unsolicited(requested, supported);
    if !extra.is_empty() {
        tracing::debug!(%extra, "device offered tests that were not requested");
    }

    if selected.is_empty() {
        return false;
    }
    registry.retain_active(selected);
    tracing::info!("[Query]: user-selected test ids = {selected}");
    true
}

fn unsolicited(requested: TestBitmap, supported: TestBitmap) -> TestBitmap {
    TestBitmap::from_bits(supported.bits() & !requested.bits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::shell::{CommandExecutor, ExecutionResult};

    struct Answer(&'static str);

    impl CommandExecutor for Answer {
        fn execute(&self, _: &str, _: &[String], _: bool) -> Result<ExecutionResult> {
            Ok(ExecutionResult {
                status: 0,
                lines: vec![self.0.to_string()],
            })
        }
    }

    fn active_bits(registry: &TestRegistry) -> Vec<u32> {
        registry.active().map(|t| t.bit().bits()).collect()
    }

    #[test]
    fn narrows_to_intersection_in_catalog_order() {
        let exec = Answer("Test IDs=0xc5");
        let device = DeviceCli::new(&exec, "nvme", "marvell", "ns");
        let mut registry = TestRegistry::builtin();
        assert!(negotiate(&mut registry, &device));
        // 0x4d & 0xc5 = 0x45
        assert_eq!(active_bits(&registry), vec![0x01, 0x04, 0x40]);
    }

    #[test]
    fn zero_support_fails_and_leaves_registry_alone() {
        let exec = Answer("Test IDs=0x0");
        let device = DeviceCli::new(&exec, "nvme", "marvell", "ns");
        let mut registry = TestRegistry::builtin();
        assert!(!negotiate(&mut registry, &device));
        assert_eq!(active_bits(&registry), vec![0x01, 0x04, 0x08, 0x40]);
    }

    #[test]
    fn disjoint_support_fails() {
        let exec = Answer("Test IDs=0x32");
        let device = DeviceCli::new(&exec, "nvme", "marvell", "ns");
        let mut registry = TestRegistry::builtin();
        assert!(!negotiate(&mut registry, &device));
        assert_eq!(registry.active_len(), 4);
    }

    #[test]
    fn malformed_answer_degrades_to_failure() {
        let exec = Answer("controller busy");
        let device = DeviceCli::new(&exec, "nvme", "marvell", "ns");
        let mut registry = TestRegistry::builtin();
        assert!(!negotiate(&mut registry, &device));
    }

    #[test]
    fn unsolicited_bits_are_the_difference() {
        let extra = unsolicited(TestBitmap::from_bits(0x4d), TestBitmap::from_bits(0xff));
        assert_eq!(extra.bits(), 0xb2);
    }
}
