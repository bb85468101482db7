//! Output formatting

pub mod banner;
pub mod human;
pub mod json;

use serde::Serialize;

use crate::admin::SectionView;
use crate::cli::OutputFormat;

/// Format a dashboard section
pub fn format_section(view: &SectionView, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => human::format_section(view),
        OutputFormat::Json => json::format(view),
    }
}

/// Format any value with a human renderer, or as JSON
pub fn render<T: Serialize>(value: &T, format: OutputFormat, human: impl FnOnce(&T) -> String) -> String {
    match format {
        OutputFormat::Human => human(value),
        OutputFormat::Json => json::format(value),
    }
}
