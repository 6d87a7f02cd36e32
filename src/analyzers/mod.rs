//! Grouped statistics over evaluated tests.
//!
//! Tests are bucketed by calendar day, site or hour label and each bucket is
//! reduced to a [`types::SummaryRecord`]. Site summaries can additionally be
//! correlated with trouble-ticket downtime to label each site's validity.

pub mod aggregate;
pub mod types;
pub mod utility;
pub mod validity;

pub use aggregate::{TicketData, get_hours, get_progress, get_vsats, summarize};
pub use types::{DaySummary, HourSummary, SummaryRecord, Validity, VsatSummary};
