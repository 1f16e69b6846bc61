//! Driver registry
//!
//! Maps switch types to their config validator and driver factory, and
//! keeps one driver instance per registered switch.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use fabric_net_core::{NetworkError, Result, SwitchRecord, SwitchType};
use fabric_switch_core::{Connector, SwitchDriver};
use log::{debug, info};

use crate::dellos9::DellNos9Driver;
use crate::mock::{MockFabric, MockSwitchDriver};

/// Validates driver-specific switch configuration
pub type ConfigValidator = fn(&serde_json::Value) -> Result<()>;

/// Builds a driver instance for a switch record
pub type DriverFactory = Box<dyn Fn(&SwitchRecord) -> Result<Arc<dyn SwitchDriver>> + Send + Sync>;

struct DriverEntry {
    validate: ConfigValidator,
    create: DriverFactory,
}

/// A driver together with the record it was built from
struct CachedDriver {
    record: SwitchRecord,
    driver: Arc<dyn SwitchDriver>,
}

/// Registry of switch driver families
pub struct DriverRegistry {
    factories: RwLock<HashMap<SwitchType, DriverEntry>>,
    drivers: RwLock<HashMap<String, CachedDriver>>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            drivers: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the built-in families: Dell OS9 reached through
    /// `connector`, and the mock backed by `fabric`.
    pub fn with_defaults(connector: Arc<dyn Connector>, fabric: MockFabric) -> Self {
        let registry = Self::new();

        registry.register_driver(
            SwitchType::DellNos9,
            <DellNos9Driver as SwitchDriver>::validate,
            Box::new(move |record: &SwitchRecord| -> Result<Arc<dyn SwitchDriver>> {
                let driver = DellNos9Driver::new(record, Arc::clone(&connector))?;
                Ok(Arc::new(driver))
            }),
        );

        registry.register_driver(
            SwitchType::Mock,
            <MockSwitchDriver as SwitchDriver>::validate,
            Box::new(move |record: &SwitchRecord| -> Result<Arc<dyn SwitchDriver>> {
                let driver = MockSwitchDriver::new(record, fabric.clone())?;
                Ok(Arc::new(driver))
            }),
        );

        registry
    }

    /// Register (or replace) a driver family
    pub fn register_driver(
        &self,
        switch_type: SwitchType,
        validate: ConfigValidator,
        create: DriverFactory,
    ) {
        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        factories.insert(switch_type, DriverEntry { validate, create });
        info!("registered switch driver: {}", switch_type);
    }

    /// Validate a switch record before it is stored. No device is contacted.
    pub fn validate(&self, record: &SwitchRecord) -> Result<()> {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        let entry = factories
            .get(&record.switch_type)
            .ok_or_else(|| unsupported(record.switch_type))?;
        (entry.validate)(&record.config)
    }

    /// Driver for `record`, created on first use and rebuilt whenever the
    /// record differs from the one the cached driver was built from.
    pub fn driver(&self, record: &SwitchRecord) -> Result<Arc<dyn SwitchDriver>> {
        if let Some(cached) = self
            .drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&record.label)
        {
            if cached.record == *record {
                return Ok(Arc::clone(&cached.driver));
            }
        }

        let driver = {
            let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
            let entry = factories
                .get(&record.switch_type)
                .ok_or_else(|| unsupported(record.switch_type))?;
            (entry.validate)(&record.config)?;
            (entry.create)(record)?
        };

        debug!("created {} driver for switch {}", record.switch_type, record.label);
        self.drivers.write().unwrap_or_else(PoisonError::into_inner).insert(
            record.label.clone(),
            CachedDriver {
                record: record.clone(),
                driver: Arc::clone(&driver),
            },
        );
        Ok(driver)
    }

    /// Forget the driver instance of a switch, e.g. after its config changed.
    pub fn evict(&self, label: &str) -> bool {
        self.drivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(label)
            .is_some()
    }

    pub fn registered_types(&self) -> Vec<SwitchType> {
        let mut types: Vec<SwitchType> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        types.sort_by_key(|t| t.to_string());
        types
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn unsupported(switch_type: SwitchType) -> NetworkError {
    NetworkError::bad_argument(format!("no driver registered for switch type {}", switch_type))
}
