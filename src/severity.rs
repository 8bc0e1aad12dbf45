/// Grades vulnerable-user harm on a corridor-shift as an ordinal code.
///
/// | Condition                          | Code |
/// |------------------------------------|------|
/// | no vulnerable deaths or injuries   | 0    |
/// | vulnerable injuries, no deaths     | 1    |
/// | any vulnerable deaths              | 2    |
pub fn classify(vuln_deaths: u64, vuln_injuries: u64) -> u8 {
    match (vuln_deaths, vuln_injuries) {
        (0, 0) => 0,
        (0, _) => 1,
        (_, _) => 2,
    }
}
