//! # Human-readable overview of an orchestrator.
//!
//! [`Overview`] is a snapshot taken by `Orchestrator::overview()`; its `Display` output
//! looks like:
//!
//! ```text
//! ==================== Overview ====================
//! cluster: local
//! ==================== Clients  ====================
//! kind | name | description
//! static | httpclient | billing api
//! discovery | httpclient | ip lookup
//! ==================== Services ====================
//! kind | name | description
//! service | api | public API
//! ==================================================
//! ```

use std::fmt;

/// One line of the clients or services table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverviewRow {
    /// `static`, `discovery` or `service`.
    pub kind: &'static str,
    pub name: String,
    pub description: String,
}

/// Snapshot of the joined cluster, registered clients and set-up services.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Overview {
    /// Name of the joined cluster, `None` before `join`.
    pub cluster: Option<String>,
    /// Clients in registration order.
    pub clients: Vec<OverviewRow>,
    /// Services in setup order.
    pub services: Vec<OverviewRow>,
}

const RULE: &str = "==================================================";

impl fmt::Display for Overview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==================== Overview ====================")?;
        writeln!(f, "cluster: {}", self.cluster.as_deref().unwrap_or(""))?;
        writeln!(f, "==================== Clients  ====================")?;
        write_rows(f, &self.clients)?;
        writeln!(f, "==================== Services ====================")?;
        write_rows(f, &self.services)?;
        writeln!(f, "{RULE}")
    }
}

fn write_rows(f: &mut fmt::Formatter<'_>, rows: &[OverviewRow]) -> fmt::Result {
    writeln!(f, "kind | name | description")?;
    for row in rows {
        writeln!(f, "{} | {} | {}", row.kind, row.name, row.description)?;
    }
    Ok(())
}
