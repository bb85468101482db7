//! Client for the annotation service's JSON endpoints
//!
//! Every operation is one HTTP call. Failures come back as
//! [`Error::Network`](crate::Error::Network) when no response arrived and
//! [`Error::Api`](crate::Error::Api) when the server reported one.

pub mod admin;
pub mod client;
pub mod labels;
pub mod quiz;
pub mod session;

pub use admin::{
    AdminAccount, AdminList, AdminRole, ConsistencyDetail, ConsistencyReport, ExportFormat,
    ExportParams, NewAdmin, TestSettingFlag, TestSettingsUpdate,
};
pub use client::ApiClient;
pub use labels::{AudioEntry, LabelRecord};
pub use quiz::{ConsistencyAnswer, ConsistencyQuestion, QuestionKind, TestQuestion, TestResult};
pub use session::{SessionStatus, TestSettings};
