use chrono::NaiveDate;
use clap::ValueEnum;

use crate::api::client::ListMethod;

/// One export job, mapping 1:1 to a vendor list endpoint plus the shaping
/// applied to its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobKind {
    /// Dispatched duties reduced to the duty-slip columns.
    Dispatched,
    /// Dispatched duties reduced to the nine dispatch-board columns.
    DispatchedSummary,
    /// Billed duties with invoices split out.
    Billed,
    /// On-account receipts.
    Receipts,
    CreditNotes,
    DebitNotes,
    /// Fuel logs for completed duties.
    VehicleFuels,
    /// Full driver roster.
    Drivers,
    /// Full vehicle roster with list fields expanded to extra sheets.
    Vehicles,
}

/// Where a selected output column reads from.
pub enum ColumnSource {
    Path(&'static str),
    /// First path whose value is a non-null scalar. Covers fields the API
    /// returns sometimes as a nested object, sometimes as a plain string.
    FirstOf(&'static [&'static str]),
    /// Joins the `name` of each item in a list field into one
    /// comma-separated cell.
    JoinNames(&'static str),
}

pub struct ColumnSpec {
    pub header: &'static str,
    pub source: ColumnSource,
}

pub enum ColumnPolicy {
    /// Every flattened column, with static renames applied.
    Flatten {
        renames: &'static [(&'static str, &'static str)],
    },
    /// A fixed column selection in output order.
    Select(&'static [ColumnSpec]),
}

pub enum ListPolicy {
    /// Nested lists stay in the primary table as JSON text.
    Inline,
    /// One named list field becomes an auxiliary table keyed by a parent
    /// identifier.
    Split {
        path: &'static str,
        sheet: &'static str,
        parent_column: &'static str,
        parent_sources: &'static [&'static str],
    },
    /// Every detected list column becomes its own auxiliary table.
    ExpandAll {
        parent_column: &'static str,
        parent_sources: &'static [&'static str],
    },
}

/// Default start of the fetch window when `--from` is not given.
#[derive(Debug, Clone, Copy)]
pub enum WindowStart {
    Fixed(i32, u32, u32),
    DaysBack(i64),
}

/// Date-chunked fetching parameters for endpoints filtered by dateRange.
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    pub default_start: WindowStart,
    pub chunk_days: u32,
    pub pause_millis: u64,
}

impl WindowStart {
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match *self {
            WindowStart::Fixed(year, month, day) => {
                NaiveDate::from_ymd_opt(year, month, day).expect("valid catalog date")
            }
            WindowStart::DaysBack(days) => today - chrono::Duration::days(days),
        }
    }
}

pub struct JobSpec {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub method: ListMethod,
    pub page_size: u32,
    /// Static part of the filter body (`criteria`, `noteType`, ...).
    pub filter: &'static [(&'static str, &'static str)],
    pub window: Option<DateWindow>,
    pub columns: ColumnPolicy,
    pub lists: ListPolicy,
    pub dedupe_key: Option<&'static str>,
    pub sheet: &'static str,
    /// Whether sheets are split at the rows-per-sheet cap.
    pub chunk_rows: bool,
    pub output_file: &'static str,
}

const DUTY_RENAMES: &[(&str, &str)] = &[
    ("customer.name", "Customer Name"),
    ("customer.id", "Customer ID"),
    ("vehicle.number", "Vehicle Number"),
    ("vehicle.type", "Vehicle Type"),
];

// `dutySlip` is sometimes absent or a bare string; `Path` through it
// yields null in those cases, like the dict guard in the source system.
const DISPATCHED_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        header: "customer",
        source: ColumnSource::Path("customer"),
    },
    ColumnSpec {
        header: "vehicleId",
        source: ColumnSource::Path("vehicleId"),
    },
    ColumnSpec {
        header: "pickUpTime",
        source: ColumnSource::Path("pickUpTime"),
    },
    ColumnSpec {
        header: "dutySlip.startDate",
        source: ColumnSource::Path("dutySlip.startDate"),
    },
    ColumnSpec {
        header: "dutySlip.endDate",
        source: ColumnSource::Path("dutySlip.endDate"),
    },
    ColumnSpec {
        header: "status",
        source: ColumnSource::Path("status"),
    },
    ColumnSpec {
        header: "dutyId",
        source: ColumnSource::Path("dutyId"),
    },
    ColumnSpec {
        header: "driverId",
        source: ColumnSource::Path("driverId"),
    },
    ColumnSpec {
        header: "driverPhoneNumber",
        source: ColumnSource::Path("driverPhoneNumber"),
    },
];

const DISPATCH_BOARD_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        header: "dutyId",
        source: ColumnSource::Path("dutyId"),
    },
    ColumnSpec {
        header: "customer",
        source: ColumnSource::FirstOf(&["customer.name", "customer"]),
    },
    ColumnSpec {
        header: "pickUpTime",
        source: ColumnSource::Path("pickUpTime"),
    },
    ColumnSpec {
        header: "dropOffTime",
        source: ColumnSource::Path("dropOffTime"),
    },
    ColumnSpec {
        header: "driverId",
        source: ColumnSource::FirstOf(&["driver.name", "driver", "driverId"]),
    },
    ColumnSpec {
        header: "driverPhoneNumber",
        source: ColumnSource::FirstOf(&["driver.phoneNumber", "driverPhoneNumber"]),
    },
    ColumnSpec {
        header: "supplierId",
        source: ColumnSource::FirstOf(&["supplier.name", "supplier", "supplierId"]),
    },
    ColumnSpec {
        header: "supplierPhoneNumber",
        source: ColumnSource::FirstOf(&["supplier.phoneNumber", "supplierPhoneNumber"]),
    },
    ColumnSpec {
        header: "passengers",
        source: ColumnSource::JoinNames("passengers"),
    },
];

const DRIVER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        header: "name",
        source: ColumnSource::Path("name"),
    },
    ColumnSpec {
        header: "phone",
        source: ColumnSource::Path("phone"),
    },
    ColumnSpec {
        header: "panCard",
        source: ColumnSource::Path("panCard"),
    },
    ColumnSpec {
        header: "aadhar",
        source: ColumnSource::Path("aadhar"),
    },
    ColumnSpec {
        header: "birthday",
        source: ColumnSource::Path("birthday"),
    },
    ColumnSpec {
        header: "joiningDate",
        source: ColumnSource::Path("joiningDate"),
    },
    ColumnSpec {
        header: "salary",
        source: ColumnSource::Path("salary"),
    },
    ColumnSpec {
        header: "active",
        source: ColumnSource::Path("active"),
    },
    ColumnSpec {
        header: "license_number",
        source: ColumnSource::Path("license.number"),
    },
    ColumnSpec {
        header: "license_expiry_date",
        source: ColumnSource::Path("license.expiryDate"),
    },
];

impl JobKind {
    pub fn spec(&self) -> JobSpec {
        match self {
            JobKind::Dispatched => JobSpec {
                name: "dispatched",
                endpoint: "duties",
                method: ListMethod::Post,
                page_size: 100,
                filter: &[("criteria", "dispatched")],
                window: Some(DateWindow {
                    default_start: WindowStart::DaysBack(60),
                    chunk_days: 7,
                    pause_millis: 1000,
                }),
                columns: ColumnPolicy::Select(DISPATCHED_COLUMNS),
                lists: ListPolicy::Inline,
                dedupe_key: Some("dutyId"),
                sheet: "Duties",
                chunk_rows: false,
                output_file: "dispatched.xlsx",
            },
            JobKind::DispatchedSummary => JobSpec {
                name: "dispatched-summary",
                endpoint: "duties",
                method: ListMethod::Post,
                page_size: 100,
                filter: &[("criteria", "dispatched")],
                window: Some(DateWindow {
                    default_start: WindowStart::DaysBack(60),
                    chunk_days: 7,
                    pause_millis: 1000,
                }),
                columns: ColumnPolicy::Select(DISPATCH_BOARD_COLUMNS),
                lists: ListPolicy::Inline,
                dedupe_key: Some("dutyId"),
                sheet: "Duties",
                chunk_rows: false,
                output_file: "dispatched_summary.xlsx",
            },
            JobKind::Billed => JobSpec {
                name: "billed",
                endpoint: "duties",
                method: ListMethod::Post,
                page_size: 1000,
                filter: &[("criteria", "billed")],
                window: Some(DateWindow {
                    default_start: WindowStart::Fixed(2022, 4, 1),
                    chunk_days: 3,
                    pause_millis: 500,
                }),
                columns: ColumnPolicy::Flatten {
                    renames: DUTY_RENAMES,
                },
                lists: ListPolicy::Split {
                    path: "invoices",
                    sheet: "Invoices",
                    parent_column: "dutyId",
                    parent_sources: &["dutyId"],
                },
                dedupe_key: None,
                sheet: "Duties",
                chunk_rows: true,
                output_file: "billed.xlsx",
            },
            JobKind::Receipts => JobSpec {
                name: "receipts",
                endpoint: "receipts",
                method: ListMethod::Post,
                page_size: 100,
                filter: &[("paymentType", "onAccount")],
                window: Some(DateWindow {
                    default_start: WindowStart::Fixed(2025, 10, 1),
                    chunk_days: 7,
                    pause_millis: 500,
                }),
                columns: ColumnPolicy::Flatten { renames: &[] },
                lists: ListPolicy::Inline,
                dedupe_key: None,
                sheet: "Receipts",
                chunk_rows: true,
                output_file: "receipts.xlsx",
            },
            JobKind::CreditNotes => JobSpec {
                name: "credit-notes",
                endpoint: "credit-debit-notes",
                method: ListMethod::Post,
                page_size: 100,
                filter: &[("noteType", "credit")],
                window: Some(DateWindow {
                    default_start: WindowStart::Fixed(2022, 4, 1),
                    chunk_days: 7,
                    pause_millis: 500,
                }),
                columns: ColumnPolicy::Flatten { renames: &[] },
                lists: ListPolicy::Inline,
                dedupe_key: None,
                sheet: "Notes",
                chunk_rows: true,
                output_file: "credit_notes.xlsx",
            },
            JobKind::DebitNotes => JobSpec {
                name: "debit-notes",
                endpoint: "credit-debit-notes",
                method: ListMethod::Post,
                page_size: 100,
                filter: &[("noteType", "debit")],
                window: Some(DateWindow {
                    default_start: WindowStart::Fixed(2022, 4, 1),
                    chunk_days: 7,
                    pause_millis: 500,
                }),
                columns: ColumnPolicy::Flatten { renames: &[] },
                lists: ListPolicy::Inline,
                dedupe_key: None,
                sheet: "Notes",
                chunk_rows: true,
                output_file: "debit_notes.xlsx",
            },
            JobKind::VehicleFuels => JobSpec {
                name: "vehicle-fuels",
                endpoint: "vehicle-fuels",
                method: ListMethod::Post,
                page_size: 100,
                filter: &[("criteria", "completed")],
                window: Some(DateWindow {
                    default_start: WindowStart::Fixed(2022, 4, 1),
                    chunk_days: 7,
                    pause_millis: 1000,
                }),
                columns: ColumnPolicy::Flatten { renames: &[] },
                lists: ListPolicy::Inline,
                dedupe_key: None,
                sheet: "Fuels",
                chunk_rows: true,
                output_file: "vehicle_fuels.xlsx",
            },
            JobKind::Drivers => JobSpec {
                name: "drivers",
                endpoint: "drivers",
                method: ListMethod::Get,
                page_size: 1000,
                filter: &[],
                window: None,
                columns: ColumnPolicy::Select(DRIVER_COLUMNS),
                lists: ListPolicy::Inline,
                dedupe_key: None,
                sheet: "Drivers",
                chunk_rows: false,
                output_file: "drivers.xlsx",
            },
            JobKind::Vehicles => JobSpec {
                name: "vehicles",
                endpoint: "vehicles",
                method: ListMethod::Get,
                page_size: 1000,
                filter: &[],
                window: None,
                columns: ColumnPolicy::Flatten { renames: &[] },
                lists: ListPolicy::ExpandAll {
                    parent_column: "vehicleId",
                    parent_sources: &["vehicleId", "id"],
                },
                dedupe_key: None,
                sheet: "Vehicles",
                chunk_rows: false,
                output_file: "vehicles.xlsx",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_start_resolution() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

        assert_eq!(
            WindowStart::Fixed(2022, 4, 1).resolve(today),
            NaiveDate::from_ymd_opt(2022, 4, 1).unwrap()
        );
        assert_eq!(
            WindowStart::DaysBack(60).resolve(today),
            NaiveDate::from_ymd_opt(2024, 4, 16).unwrap()
        );
    }

    #[test]
    fn test_note_jobs_share_endpoint_with_distinct_filters() {
        let credit = JobKind::CreditNotes.spec();
        let debit = JobKind::DebitNotes.spec();

        assert_eq!(credit.endpoint, debit.endpoint);
        assert_eq!(credit.filter, &[("noteType", "credit")][..]);
        assert_eq!(debit.filter, &[("noteType", "debit")][..]);
    }

    #[test]
    fn test_roster_jobs_use_get_with_no_window() {
        for kind in [JobKind::Drivers, JobKind::Vehicles] {
            let spec = kind.spec();
            assert_eq!(spec.method, ListMethod::Get);
            assert!(spec.window.is_none());
            assert!(spec.filter.is_empty());
        }
    }
}
