//! Timetable generation
//!
//! A class gets a 5 day by 6 period grid. Each period is filled by a
//! `SlotAssigner`; the default `RandomAssigner` draws a subject uniformly
//! per period and picks a teacher by specialization. There is no conflict
//! avoidance: subjects may repeat and staff may be double-booked.

use rand::rngs::ThreadRng;
use rand::Rng;

use crate::error::{CoreError, CoreResult};
use crate::models::{ClassKey, Day, Staff, Subject, TimetableSlot};

/// Periods in a teaching day
pub const PERIODS_PER_DAY: u8 = 6;

/// Staff name used when a department has nobody to assign
pub const UNASSIGNED_STAFF_NAME: &str = "TBD";

/// Staff id used when a department has nobody to assign
pub const UNASSIGNED_STAFF_ID: &str = "NA";

/// Subject and teacher chosen for one period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub subject: String,
    pub staff_name: String,
    pub staff_id: String,
}

/// Strategy filling a single period
pub trait SlotAssigner {
    /// Choose a subject and teacher; `subjects` is never empty
    fn assign(&mut self, subjects: &[Subject], staff: &[Staff]) -> Assignment;
}

/// Uniform random subject per period
pub struct RandomAssigner<R: Rng> {
    rng: R,
}

impl RandomAssigner<ThreadRng> {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl Default for RandomAssigner<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomAssigner<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> SlotAssigner for RandomAssigner<R> {
    fn assign(&mut self, subjects: &[Subject], staff: &[Staff]) -> Assignment {
        let subject = &subjects[self.rng.gen_range(0..subjects.len())];
        match_staff(&subject.name, staff)
    }
}

/// Pick the teacher for a subject
///
/// First staff member whose specialization mentions the subject, else the
/// first staff member, else the `TBD`/`NA` placeholder.
pub fn match_staff(subject_name: &str, staff: &[Staff]) -> Assignment {
    let teacher = staff
        .iter()
        .find(|s| s.teaches(subject_name))
        .or_else(|| staff.first());

    let (staff_name, staff_id) = match teacher {
        Some(t) => (t.name.clone(), t.staff_no.clone()),
        None => (
            UNASSIGNED_STAFF_NAME.to_string(),
            UNASSIGNED_STAFF_ID.to_string(),
        ),
    };

    Assignment {
        subject: subject_name.to_string(),
        staff_name,
        staff_id,
    }
}

/// Build the full weekly grid for a class
///
/// `subjects` are the semester's subjects and `staff` the department's
/// staff, both in catalog order.
pub fn generate_grid(
    class: &ClassKey,
    subjects: &[Subject],
    staff: &[Staff],
    assigner: &mut dyn SlotAssigner,
) -> CoreResult<Vec<TimetableSlot>> {
    if subjects.is_empty() {
        return Err(CoreError::NoSubjectsAvailable {
            dept: class.dept.clone(),
            semester: class.sem,
        });
    }

    let mut slots = Vec::with_capacity(Day::ALL.len() * PERIODS_PER_DAY as usize);
    for day in Day::ALL {
        for period in 1..=PERIODS_PER_DAY {
            let assignment = assigner.assign(subjects, staff);
            slots.push(TimetableSlot {
                dept: class.dept.clone(),
                sem: class.sem,
                sec: class.sec.clone(),
                day,
                period,
                subject: assignment.subject,
                staff: assignment.staff_name,
                staff_id: assignment.staff_id,
            });
        }
    }
    Ok(slots)
}
