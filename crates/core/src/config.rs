//! Lab plan configuration - the fixed set of tests and devices.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use crate::id::{CellKey, DeviceId, TestId};

/// Errors raised while validating a lab plan.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The plan defines no tests
    #[error("lab plan defines no tests")]
    NoTests,

    /// The plan defines no devices
    #[error("lab plan defines no devices")]
    NoDevices,

    /// A test has a zero duration
    #[error("test {0} has a zero duration")]
    ZeroDuration(TestId),

    /// A test identifier appears twice
    #[error("duplicate test: {0}")]
    DuplicateTest(TestId),

    /// A device identifier appears twice
    #[error("duplicate device: {0}")]
    DuplicateDevice(DeviceId),

    /// A test or device identifier is blank
    #[error("empty identifier in lab plan")]
    EmptyIdentifier,

    /// A cell outside the configured plan
    #[error("unknown cell: {0}")]
    UnknownCell(CellKey),

    /// The plan document could not be parsed
    #[error("invalid lab plan: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A characterization test with its expected duration per device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabTest {
    /// Test identifier
    pub id: TestId,

    /// Expected duration in minutes, applied to every device
    pub minutes: u32,
}

impl LabTest {
    /// Create a test entry.
    pub fn new(id: impl Into<TestId>, minutes: u32) -> Self {
        Self {
            id: id.into(),
            minutes,
        }
    }
}

/// The statically configured lab plan.
///
/// Order is preserved: tests and devices are reported in the order they are
/// declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabConfig {
    /// Tests to run on every device
    pub tests: Vec<LabTest>,

    /// Devices under test
    pub devices: Vec<DeviceId>,
}

impl LabConfig {
    /// Create a plan from tests and devices. Call [`LabConfig::validate`]
    /// before using it.
    pub fn new(tests: Vec<LabTest>, devices: Vec<DeviceId>) -> Self {
        Self { tests, devices }
    }

    /// Parse and validate a plan from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the plan is usable: at least one test and one device, positive
    /// durations, unique non-empty identifiers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tests.is_empty() {
            return Err(ConfigError::NoTests);
        }
        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }

        let mut seen_tests = HashSet::new();
        for test in &self.tests {
            if test.id.as_str().trim().is_empty() {
                return Err(ConfigError::EmptyIdentifier);
            }
            if test.minutes == 0 {
                return Err(ConfigError::ZeroDuration(test.id.clone()));
            }
            if !seen_tests.insert(&test.id) {
                return Err(ConfigError::DuplicateTest(test.id.clone()));
            }
        }

        let mut seen_devices = HashSet::new();
        for device in &self.devices {
            if device.as_str().trim().is_empty() {
                return Err(ConfigError::EmptyIdentifier);
            }
            if !seen_devices.insert(device) {
                return Err(ConfigError::DuplicateDevice(device.clone()));
            }
        }

        Ok(())
    }

    /// Duration table keyed by test.
    pub fn durations(&self) -> BTreeMap<TestId, u32> {
        self.tests.iter().map(|t| (t.id.clone(), t.minutes)).collect()
    }

    /// Number of devices under test.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Look up a test's duration.
    pub fn minutes_for(&self, test: &TestId) -> Option<u32> {
        self.tests.iter().find(|t| &t.id == test).map(|t| t.minutes)
    }

    /// Whether a cell belongs to this plan.
    pub fn contains(&self, key: &CellKey) -> bool {
        self.minutes_for(&key.test).is_some() && self.devices.contains(&key.device)
    }

    /// Resolve a (test, device) pair into a key of this plan.
    pub fn cell(&self, test: &str, device: &str) -> Result<CellKey, ConfigError> {
        let key = CellKey::new(test, device);
        if self.contains(&key) {
            Ok(key)
        } else {
            Err(ConfigError::UnknownCell(key))
        }
    }

    /// All cells of the plan, test-major in declaration order.
    pub fn cells(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.tests.iter().flat_map(move |test| {
            self.devices
                .iter()
                .map(move |device| CellKey::new(test.id.clone(), device.clone()))
        })
    }
}

impl Default for LabConfig {
    /// The power-stage characterization plan: eleven tests on five DUTs.
    fn default() -> Self {
        let tests = [
            ("PWM_SW_DELAY", 45),
            ("DEAD_TIME", 30),
            ("TRISTATE_DELAY", 45),
            ("SW_MIN_ON", 30),
            ("SW_MIN_OFF", 30),
            ("CS_ACCURACY", 75),
            ("OCP_POS_NEG", 40),
            ("HIGH_DUTY", 30),
            ("EFFICIENCY", 420),
            ("SYNC_HIZ_DELAY", 30),
            ("CS_COMMON_MODE", 45),
        ]
        .into_iter()
        .map(|(id, minutes)| LabTest::new(id, minutes))
        .collect();

        let devices = ["DUT1", "DUT2", "DUT3", "DUT4", "DUT5"]
            .into_iter()
            .map(DeviceId::from)
            .collect();

        Self { tests, devices }
    }
}
