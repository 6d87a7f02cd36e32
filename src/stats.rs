use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::filter::filter_tickets;
use crate::records::{LocationRecord, TicketRecord};

/// Overview of the loaded registry and ticket exports.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct DatasetInfo {
    /// Distinct registered site codes.
    pub locations: usize,
    /// Tickets belonging to registered beneficiaries, opened up to `now`.
    pub tickets: usize,
    pub first_ticket: Option<NaiveDateTime>,
    pub last_ticket: Option<NaiveDateTime>,
}

impl DatasetInfo {
    pub fn from_data(locations: &[LocationRecord], tickets: &[TicketRecord], now: NaiveDateTime) -> Self {
        let codes: HashSet<&str> = locations.iter().map(|l| l.site_code.as_str()).collect();
        let scoped = filter_tickets(tickets, locations, NaiveDateTime::MIN, now);

        DatasetInfo {
            locations: codes.len(),
            tickets: scoped.len(),
            first_ticket: scoped.iter().map(|t| t.start).min(),
            last_ticket: scoped.iter().map(|t| t.start).max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_data() {
        let info = DatasetInfo::from_data(&[], &[], ts(1));
        assert_eq!(info, DatasetInfo::default());
    }

    #[test]
    fn test_counts_registered_tickets_only() {
        let locations = vec![
            LocationRecord {
                site_code: "500".into(),
                ben_id: 70001,
            },
            LocationRecord {
                site_code: "500".into(),
                ben_id: 70001,
            },
        ];
        let ticket = |ben_id, day| TicketRecord {
            ben_id: Some(ben_id),
            site_code: None,
            start: ts(day),
            end: None,
        };
        let tickets = vec![ticket(70001, 4), ticket(70001, 2), ticket(79999, 1), ticket(70001, 20)];

        let info = DatasetInfo::from_data(&locations, &tickets, ts(10));
        assert_eq!(info.locations, 1);
        assert_eq!(info.tickets, 2);
        assert_eq!(info.first_ticket, Some(ts(2)));
        assert_eq!(info.last_ticket, Some(ts(4)));
    }
}
