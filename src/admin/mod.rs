//! Admin dashboard: sections, row actions, charts and report exports

pub mod charts;
pub mod dashboard;
pub mod export;

pub use charts::{Chart, ChartKind, ChartRegistry, ChartSlot};
pub use dashboard::{ActionOutcome, AdminAction, AdminDashboard, Section, SectionView};
pub use export::{consistency_csv, consistency_json, report_filename, write_report};
