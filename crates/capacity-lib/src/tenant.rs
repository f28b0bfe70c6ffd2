//! Tenant resolution for volume records
//!
//! Ownership is looked up by exact `(pool, storage system)` match. Anything
//! unmapped falls into [`TenantAssignment::Unknown`], which the hierarchy
//! always nests under its storage system, so each system gets its own
//! UNKNOWN bucket.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::models::{TenantMappingEntry, VolumeRecord};
use crate::quality::DataQualityWarning;

/// Display label of the fallback tenant
pub const UNKNOWN_TENANT_LABEL: &str = "UNKNOWN";

/// Normalize an identifier before it is used as a grouping or lookup key
pub fn normalize_identifier(raw: &str) -> &str {
    raw.trim()
}

/// Resolved owner of a pool
///
/// Ordering puts mapped tenants (by name) before the UNKNOWN bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TenantAssignment {
    Mapped(String),
    Unknown,
}

impl TenantAssignment {
    pub fn label(&self) -> &str {
        match self {
            TenantAssignment::Mapped(name) => name,
            TenantAssignment::Unknown => UNKNOWN_TENANT_LABEL,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TenantAssignment::Unknown)
    }

    /// True when a tenant filter selects this assignment
    pub fn matches_filter(&self, filter: &str) -> bool {
        self.label() == normalize_identifier(filter)
    }
}

impl std::fmt::Display for TenantAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lookup table from `(pool, storage system)` to tenant
#[derive(Debug, Clone, Default)]
pub struct TenantResolver {
    /// system -> pool -> tenant
    by_system: HashMap<String, HashMap<String, String>>,
    skipped: Vec<DataQualityWarning>,
}

impl TenantResolver {
    /// Build a resolver, skipping malformed or conflicting entries
    pub fn new(entries: &[TenantMappingEntry]) -> Self {
        let mut resolver = Self::default();

        for entry in entries {
            let pool = normalize_identifier(&entry.pool_id);
            let system = normalize_identifier(&entry.storage_system_id);
            let tenant = normalize_identifier(&entry.tenant_name);

            if let Some(reason) = malformed_reason(pool, system, tenant) {
                warn!(
                    pool_id = %entry.pool_id,
                    storage_system_id = %entry.storage_system_id,
                    tenant_name = %entry.tenant_name,
                    reason = %reason,
                    "Skipping malformed tenant mapping"
                );
                resolver.skipped.push(DataQualityWarning::MalformedMapping {
                    pool_id: entry.pool_id.clone(),
                    storage_system_id: entry.storage_system_id.clone(),
                    tenant_name: entry.tenant_name.clone(),
                    reason: reason.to_string(),
                });
                continue;
            }

            let pools = resolver.by_system.entry(system.to_string()).or_default();
            match pools.get(pool) {
                Some(existing) if existing != tenant => {
                    warn!(
                        pool_id = %pool,
                        storage_system_id = %system,
                        kept_tenant = %existing,
                        ignored_tenant = %tenant,
                        "Conflicting tenant mapping, keeping first entry"
                    );
                    resolver.skipped.push(DataQualityWarning::ConflictingMapping {
                        pool_id: pool.to_string(),
                        storage_system_id: system.to_string(),
                        kept_tenant: existing.clone(),
                        ignored_tenant: tenant.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    pools.insert(pool.to_string(), tenant.to_string());
                }
            }
        }

        debug!(
            mappings = resolver.len(),
            skipped = resolver.skipped.len(),
            "Tenant resolver built"
        );
        resolver
    }

    /// Resolve the owning tenant of a volume record
    pub fn resolve(&self, record: &VolumeRecord) -> TenantAssignment {
        self.resolve_pair(&record.pool_id, &record.storage_system_id)
    }

    /// Resolve the owning tenant of a `(pool, storage system)` pair
    pub fn resolve_pair(&self, pool_id: &str, storage_system_id: &str) -> TenantAssignment {
        self.by_system
            .get(normalize_identifier(storage_system_id))
            .and_then(|pools| pools.get(normalize_identifier(pool_id)))
            .map(|tenant| TenantAssignment::Mapped(tenant.clone()))
            .unwrap_or(TenantAssignment::Unknown)
    }

    /// Mapping entries that were ignored while building
    pub fn skipped_entries(&self) -> &[DataQualityWarning] {
        &self.skipped
    }

    /// Distinct mapped tenant names, sorted
    pub fn tenant_names(&self) -> Vec<String> {
        self.by_system
            .values()
            .flat_map(|pools| pools.values().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of usable `(pool, system)` mappings
    pub fn len(&self) -> usize {
        self.by_system.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn malformed_reason(pool: &str, system: &str, tenant: &str) -> Option<&'static str> {
    if pool.is_empty() {
        Some("empty pool identifier")
    } else if system.is_empty() {
        Some("empty storage system identifier")
    } else if tenant.is_empty() {
        Some("empty tenant name")
    } else if tenant.eq_ignore_ascii_case(UNKNOWN_TENANT_LABEL) {
        Some("tenant name is reserved for unmapped pools")
    } else {
        None
    }
}
