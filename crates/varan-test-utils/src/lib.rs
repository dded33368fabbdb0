//! Testing utilities for the Varan workspace
//!
//! Shared probes, fixtures and a fake type oracle.

#![allow(missing_docs)]

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use varan_metadata::Target;
use varan_registry::{Entry, TypeOracle};

/// Records the order behaviors ran in
#[derive(Debug, Clone, Default)]
pub struct Probe {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behavior that logs `label` each time it runs
    pub fn entry(&self, label: &str) -> Entry {
        let calls = Arc::clone(&self.calls);
        let name = label.to_string();
        Entry::from_fn(label, move |_site| {
            calls.lock().push(name.clone());
            Ok(None)
        })
    }

    /// Behavior that logs `label` and writes `field = <variant>` at the site
    pub fn writer(&self, label: &str, field: &str) -> Entry {
        let calls = Arc::clone(&self.calls);
        let name = label.to_string();
        let field = field.to_string();
        Entry::from_fn(label, move |site| {
            calls.lock().push(format!("{name}@{}", site.variant));
            site.write(&field, site.variant.as_str())?;
            Ok(None)
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Behavior writing a fixed value at `field`
pub fn constant(label: &str, field: &str, value: Value) -> Entry {
    let field = field.to_string();
    Entry::from_fn(label, move |site| {
        site.write(&field, value.clone())?;
        Ok(None)
    })
}

/// Type oracle backed by a `(target name, member) -> type` table
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    types: HashMap<(String, String), Value>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: &str, member: &str, declared: Value) -> Self {
        self.types
            .insert((target.to_string(), member.to_string()), declared);
        self
    }
}

impl TypeOracle for StaticOracle {
    fn declared_type(&self, target: &Target, member: &str) -> Option<Value> {
        self.types
            .get(&(target.name().to_string(), member.to_string()))
            .cloned()
    }
}

/// `Entity <- Person <- Employee`
pub fn sample_hierarchy() -> (Target, Target, Target) {
    let entity = Target::aggregate("Entity");
    let person = Target::derive("Person", &entity);
    let employee = Target::derive("Employee", &person);
    (entity, person, employee)
}

/// Route test output through the libtest capture
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
