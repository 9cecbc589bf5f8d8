//! Static migration manifests
//!
//! Declaration order is the dependency order: tables are created before
//! later files alter or rename them. Nothing in the runner sorts, dedups or
//! otherwise reorders these lists.

use serde::Serialize;
use std::fmt;

/// Which manifest a run selects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Core migrations only, for a database that already has the baseline schema
    #[default]
    Existing,
    /// Baseline schema creation followed by the core migrations
    Fresh,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Existing => write!(f, "existing"),
            Mode::Fresh => write!(f, "fresh"),
        }
    }
}

/// Tag for entries whose applicability depends on live schema state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionalKind {
    /// Rename of the donor contact column on `donatur`
    DonaturContactRename,
}

impl ConditionalKind {
    /// Stable tag used in logs and reports
    pub fn tag(self) -> &'static str {
        match self {
            ConditionalKind::DonaturContactRename => "donatur-contact-rename",
        }
    }
}

impl fmt::Display for ConditionalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One manifest item: a SQL file relative to the repository root plus skip metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationEntry {
    /// Path of the SQL file, `/`-separated, relative to the repository root
    pub file: &'static str,

    /// Skipped unless the run includes optional entries
    pub optional: bool,

    /// Live-schema check deciding whether the entry still applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalKind>,
}

impl MigrationEntry {
    /// A required, unconditional entry
    pub const fn new(file: &'static str) -> Self {
        Self {
            file,
            optional: false,
            conditional: None,
        }
    }

    /// Mark the entry optional
    pub const fn optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    /// Gate the entry on a conditional check
    pub const fn when(self, kind: ConditionalKind) -> Self {
        Self {
            conditional: Some(kind),
            ..self
        }
    }

    /// Final path component of `file`
    pub fn basename(&self) -> &'static str {
        self.file.rsplit('/').next().unwrap_or(self.file)
    }
}

/// Schema-creation migrations for an empty database
pub const BASELINE_FRESH: &[MigrationEntry] = &[
    MigrationEntry::new("packages/db/drizzle/0000_initial_schema.sql"),
    MigrationEntry::new("packages/db/drizzle/0001_campaigns.sql"),
    MigrationEntry::new("packages/db/drizzle/0002_zakat_types.sql"),
    MigrationEntry::new("packages/db/drizzle/0003_qurban.sql"),
    MigrationEntry::new("packages/db/drizzle/0004_disbursements.sql"),
    MigrationEntry::new("packages/db/drizzle/0005_ledger_accounts.sql"),
];

/// Migrations applied on top of the baseline, for existing environments
pub const CORE_EXISTING: &[MigrationEntry] = &[
    MigrationEntry::new("packages/db/migrations/001_campaign_slug.sql"),
    MigrationEntry::new("packages/db/migrations/002_mustahiq_master.sql"),
    MigrationEntry::new("packages/db/migrations/003_vendor_employee_master.sql"),
    MigrationEntry::new("packages/db/migrations/004_donatur_contact_rename.sql")
        .when(ConditionalKind::DonaturContactRename),
    MigrationEntry::new("packages/db/migrations/005_revenue_sharing.sql"),
    MigrationEntry::new("packages/db/migrations/006_disbursement_approval.sql"),
    MigrationEntry::new("packages/db/migrations/007_ledger_account_seed.sql"),
    MigrationEntry::new("packages/db/migrations/008_qurban_packages.sql"),
    MigrationEntry::new("packages/db/migrations/009_demo_seed_data.sql").optional(),
    MigrationEntry::new("packages/db/migrations/010_reporting_views.sql"),
    MigrationEntry::new("packages/db/migrations/011_drop_legacy_tables.sql").optional(),
];

/// The ordered entries a run of `mode` walks through
pub fn effective_manifest(mode: Mode) -> Vec<MigrationEntry> {
    match mode {
        Mode::Fresh => BASELINE_FRESH
            .iter()
            .chain(CORE_EXISTING.iter())
            .copied()
            .collect(),
        Mode::Existing => CORE_EXISTING.to_vec(),
    }
}

#[cfg(test)]
#[path = "manifest_test.rs"]
mod tests;
