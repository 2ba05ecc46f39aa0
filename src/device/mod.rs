//! Device abstraction layer for the Aquacomputer D5 Next.
//!
//! Provides device discovery, the feature-report transport, control
//! transactions and the telemetry cache.

pub mod d5next;
pub mod telemetry;
pub mod transaction;
pub mod transport;

pub use d5next::D5Next;
pub use telemetry::{TelemetryCache, TelemetrySnapshot};
pub use transaction::{ControlTransactions, TransactionState};
pub use transport::{HidTransport, ReportDirection, TelemetryListener, Transport};
