//! Known activity codes used by the tablet client.

const ACTIVITY_NAMES: &[(i64, &str)] = &[
    (1, "Loading"),
    (2, "Travel_Loaded"),
    (3, "Unloading"),
    (4, "Travel_Empty"),
    (5, "Pre_Start"),
    (6, "Crib"),
    (7, "Training"),
    (8, "Meeting"),
    (9, "Maintenance"),
    (10, "Standby"),
    (11, "Other"),
    (12, "End_Shift"),
    (20, "Wait_Blast"),
    (21, "Wait_Drill"),
    (22, "Wait_Survey"),
    (23, "Wait_Dozer"),
    (24, "Wait_Excavator"),
    (25, "Wait_Water"),
    (26, "Wet_Holes"),
    (27, "Bad_Ground"),
    (28, "No_Pattern"),
    (50, "Breakdown"),
    (51, "Sched_Maint"),
    (52, "Parts_Wait"),
    (53, "No_Operator"),
    (54, "No_Product"),
    (80, "Other_Delay"),
];

/// Looks up the display name for an activity code.
pub fn activity_name(code: i64) -> Option<&'static str> {
    ACTIVITY_NAMES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::sanitize_str;

    #[test]
    fn test_lookup() {
        assert_eq!(activity_name(1), Some("Loading"));
        assert_eq!(activity_name(24), Some("Wait_Excavator"));
        assert_eq!(activity_name(80), Some("Other_Delay"));
        assert_eq!(activity_name(0), None);
        assert_eq!(activity_name(13), None);
    }

    #[test]
    fn test_names_are_tag_safe() {
        for (_, name) in ACTIVITY_NAMES {
            assert_eq!(sanitize_str(name), *name);
        }
    }
}
