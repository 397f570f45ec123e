use crate::models::{QuerySpec, ShiftPage, ShiftRecord};
use crate::utils::contains_ignore_case;

/// Narrow `shifts` to the records matching `spec`, earliest start first.
///
/// All present filters must match. Records with equal start times keep
/// their original relative order.
pub fn apply(shifts: &[ShiftRecord], spec: &QuerySpec) -> ShiftPage {
    let caregiver = spec.caregiver_filter();

    let mut data: Vec<ShiftRecord> = shifts
        .iter()
        .filter(|s| caregiver.map_or(true, |c| contains_ignore_case(&s.caregiver_name, c)))
        .filter(|s| spec.status.map_or(true, |status| s.status == status))
        .filter(|s| spec.role.map_or(true, |role| s.role == role))
        .filter(|s| {
            let day = s.start_time.date_naive();
            spec.date_from.map_or(true, |from| day >= from) && spec.date_to.map_or(true, |to| day <= to)
        })
        .cloned()
        .collect();

    // sort_by_key is stable
    data.sort_by_key(|s| s.start_time);

    ShiftPage {
        total: shifts.len(),
        filtered: data.len(),
        data,
    }
}
