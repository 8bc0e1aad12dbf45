//! Hour-of-day shift buckets.
//!
//! The six shift names and their hour boundaries are business constants
//! of the prioritization methodology; they change the aggregation
//! grouping and with it every downstream count.

/// Shift name for each hour of the day, indexed by hour. The night shift
/// wraps midnight: 22 and 23 share a bucket with 0 and 1.
static HOUR_SHIFTS: [&str; 24] = [
    "Nocturno 22-2",       // 0
    "Nocturno 22-2",       // 1
    "Nocturno 2-5",        // 2
    "Nocturno 2-5",        // 3
    "Nocturno 2-5",        // 4
    "DiurnoMan 5-8",       // 5
    "DiurnoMan 5-8",       // 6
    "DiurnoMan 5-8",       // 7
    "DiurnoMan 8-12",      // 8
    "DiurnoMan 8-12",      // 9
    "DiurnoMan 8-12",      // 10
    "DiurnoMan 8-12",      // 11
    "DiurnoTarde 12-18",   // 12
    "DiurnoTarde 12-18",   // 13
    "DiurnoTarde 12-18",   // 14
    "DiurnoTarde 12-18",   // 15
    "DiurnoTarde 12-18",   // 16
    "DiurnoTarde 12-18",   // 17
    "NocturnoTarde 18-22", // 18
    "NocturnoTarde 18-22", // 19
    "NocturnoTarde 18-22", // 20
    "NocturnoTarde 18-22", // 21
    "Nocturno 22-2",       // 22
    "Nocturno 22-2",       // 23
];

/// Maps an hour of day to its named shift. `None` past hour 23.
pub fn shift_for_hour(hour: u8) -> Option<&'static str> {
    HOUR_SHIFTS.get(usize::from(hour)).copied()
}
