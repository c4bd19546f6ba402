//! File-backed adapters using YAML documents.
//!
//! - [`YamlLedger`]: the durable ledger at `.agent/ledger.yaml`
//! - [`YamlTaskSource`]: task records from `.agent/tasks/{id}.yaml` and
//!   reports from `.agent/reports/{id}.report.yaml`

mod fs;
mod ledger;
mod source;

pub use ledger::{LEDGER_VERSION, YamlLedger};
pub use source::YamlTaskSource;
