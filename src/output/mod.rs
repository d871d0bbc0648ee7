//! Presentation of profiles and shortlists

pub mod formatter;

pub use formatter::{save_report_to_file, OutputFormatter, ParsedResume, ReportGenerator, Shortlist};
