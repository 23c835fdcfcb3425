//! Fixed catalogue of report sections
//!
//! Each section is declared as data: its sub-items (label, method key, padded
//! width, optional remark) and the static status columns. One generic layout
//! function in [`crate::layout`] turns a section plus its counts into rows.

use crate::{CellValue, CountSource, QueryError};
use tracing::debug;

/// One named count within a section
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubItemSpec {
    pub label: &'static str,
    /// Event-category key passed to the count source
    pub method: &'static str,
    /// Target width of label plus padding in the padded layout
    pub pad_width: usize,
    /// Text for the Remarks column on this sub-item's row
    pub remark: Option<&'static str>,
}

impl SubItemSpec {
    pub const fn new(label: &'static str, method: &'static str, pad_width: usize) -> Self {
        Self {
            label,
            method,
            pad_width,
            remark: None,
        }
    }

    pub const fn remark(mut self, remark: &'static str) -> Self {
        self.remark = Some(remark);
        self
    }
}

/// Static content of a status column (Exception Reported, Failure)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusValue {
    Text(&'static str),
    Zero,
    /// Repeats the count of the sub-item at this index
    CountOf(usize),
}

impl StatusValue {
    pub fn resolve(self, counts: &[i64]) -> CellValue {
        match self {
            StatusValue::Text(s) => CellValue::text(s),
            StatusValue::Zero => CellValue::Count(0),
            StatusValue::CountOf(i) => CellValue::Count(counts.get(i).copied().unwrap_or(0)),
        }
    }
}

/// Declarative description of one report section
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionSpec {
    pub name: &'static str,
    pub sub_items: &'static [SubItemSpec],
    pub exception: StatusValue,
    pub failure: StatusValue,
    /// Written as the Wrong Hits value on the first row
    pub wrong_hits: Option<i64>,
    /// Merge Exception Reported and Failure across the section
    pub merge_status: bool,
    /// Repeat the status values on every row instead of only the first
    pub status_every_row: bool,
    /// Sub-item indices in the order their counts are fetched; display
    /// order when unset
    pub query_order: Option<&'static [usize]>,
}

impl SectionSpec {
    pub const fn new(name: &'static str, sub_items: &'static [SubItemSpec]) -> Self {
        Self {
            name,
            sub_items,
            exception: StatusValue::Text("No"),
            failure: StatusValue::Zero,
            wrong_hits: None,
            merge_status: false,
            status_every_row: false,
            query_order: None,
        }
    }

    pub const fn exception(mut self, value: StatusValue) -> Self {
        self.exception = value;
        self
    }

    pub const fn failure(mut self, value: StatusValue) -> Self {
        self.failure = value;
        self
    }

    pub const fn wrong_hits(mut self, value: i64) -> Self {
        self.wrong_hits = Some(value);
        self
    }

    pub const fn merge_status(mut self) -> Self {
        self.merge_status = true;
        self
    }

    pub const fn status_every_row(mut self) -> Self {
        self.status_every_row = true;
        self
    }

    pub const fn query_order(mut self, order: &'static [usize]) -> Self {
        self.query_order = Some(order);
        self
    }

    /// Sub-items in the order they are queried
    pub fn queries(&self) -> impl Iterator<Item = (usize, &'static SubItemSpec)> + '_ {
        let order: Box<dyn Iterator<Item = usize>> = match self.query_order {
            Some(order) => Box::new(order.iter().copied()),
            None => Box::new(0..self.sub_items.len()),
        };
        order.filter_map(|i| self.sub_items.get(i).map(|item| (i, item)))
    }

    /// A single-count section shows the bare count without a label
    pub fn is_single(&self) -> bool {
        self.sub_items.len() == 1
    }

    /// Rows this section occupies
    pub fn row_count(&self) -> u32 {
        self.sub_items.len().max(1) as u32
    }

    /// Run this section's count queries in query order.
    ///
    /// Counts come back in display order. Stops at the first failing query.
    pub async fn fetch_counts(&self, source: &dyn CountSource) -> Result<Vec<i64>, QueryError> {
        let mut counts = vec![0; self.sub_items.len()];
        for (index, item) in self.queries() {
            let count = source.count(item.method).await?;
            debug!(section = self.name, method = item.method, count, "count fetched");
            counts[index] = count;
        }
        Ok(counts)
    }
}

const NO: StatusValue = StatusValue::Text("No");

const REMARK_RESCHEDULE: &str = "Restrict the Patient to Reschedule due to 24 Hours Check";
const REMARK_CANCEL: &str = "Restrict the Patient to Cancel due to 24 Hours Check";

const AUTHORIZE_AGENT: &[SubItemSpec] = &[SubItemSpec::new("Authorize Agent", "AuthorizeAgent", 0)];

const PATIENT_VERIFICATION: &[SubItemSpec] = &[
    SubItemSpec::new("Exact Patient Match", "ExactPatientMatch", 44),
    SubItemSpec::new("Multiple Patients Match", "MultiplePatientsMatch", 40),
    SubItemSpec::new("Patient Not Exists", "PatientNotExists", 47),
    SubItemSpec::new("Invalid Inputs", "InvalidInputs", 50),
];

const TIME_SLOTS: &[SubItemSpec] = &[
    SubItemSpec::new("For Dr. Haq", "DrHaqTimeSlot", 51),
    SubItemSpec::new("For Ami Patel", "AmiPatelTimeSlot", 49),
    SubItemSpec::new("Search First Available", "FirstAvailableSlot", 44),
    SubItemSpec::new("Search Specific Date", "SpecificDateSlot", 44),
    SubItemSpec::new("Search Telehealth Slot", "TelehealthSlot", 43),
];

const ADD_APPOINTMENT: &[SubItemSpec] = &[
    SubItemSpec::new("Appointment Added", "AddedAppointment", 40),
    SubItemSpec::new("Already Scheduled Message", "AlreadyScheduledAppointment", 35),
    SubItemSpec::new("14 Days Message", "14DaysMessage", 45),
    SubItemSpec::new("Duplicate Entry", "DuplicateMessage", 48),
];

const RESCHEDULE: &[SubItemSpec] = &[
    SubItemSpec::new("24 Hours Reschedule", "HoursRescheduleAppointment", 41).remark(REMARK_RESCHEDULE),
    SubItemSpec::new("Rescheduled", "RescheduleAppointment", 48),
];

const CANCELLED: &[SubItemSpec] = &[
    SubItemSpec::new("Cancelled", "CancelledAppointment", 51),
    SubItemSpec::new("24 Hours Cancelled", "Cancelled24HoursAppointment", 43).remark(REMARK_CANCEL),
];

const LAB_RESULTS: &[SubItemSpec] = &[SubItemSpec::new("Lab Results", "LabResult", 0)];

const TASK_CREATION: &[SubItemSpec] = &[SubItemSpec::new("Task Creation", "TaskCreation", 0)];

// The deployed log has no dedicated prescription key; remap it through
// `method_overrides` in the database config.
const PRESCRIPTION: &[SubItemSpec] = &[SubItemSpec::new("Prescription", "", 0)];

/// Report sections in render order
pub const CATALOGUE: &[SectionSpec] = &[
    SectionSpec::new("Authorize Agent", AUTHORIZE_AGENT),
    SectionSpec::new("Patient Verification", PATIENT_VERIFICATION)
        .wrong_hits(0)
        .merge_status(),
    SectionSpec::new("Time Slots", TIME_SLOTS)
        .failure(NO)
        .wrong_hits(0)
        .merge_status(),
    SectionSpec::new("Add Appointment", ADD_APPOINTMENT)
        .failure(NO)
        .wrong_hits(0)
        .merge_status(),
    SectionSpec::new("Reschedule", RESCHEDULE)
        .failure(NO)
        .wrong_hits(0)
        .merge_status(),
    SectionSpec::new("Cancelled", CANCELLED)
        .exception(StatusValue::CountOf(0))
        .failure(NO)
        .wrong_hits(0)
        .status_every_row()
        .query_order(&[1, 0]),
    SectionSpec::new("Lab Results", LAB_RESULTS)
        .failure(NO)
        .wrong_hits(0),
    SectionSpec::new("Task Creation", TASK_CREATION),
    SectionSpec::new("Prescription", PRESCRIPTION),
];

/// Every method key the catalogue queries, in query order
pub fn method_keys() -> impl Iterator<Item = &'static str> {
    CATALOGUE
        .iter()
        .flat_map(|section| section.queries().map(|(_, item)| item.method))
}
