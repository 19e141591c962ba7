//! Milestone detection for the Player's innings

/// Half-century threshold
pub const HALF_CENTURY: u32 = 50;

/// Spacing of the century milestones
pub const CENTURY: u32 = 100;

/// Milestone crossed by moving from `old_score` to `new_score`, if any.
///
/// Crossing 50 wins over a century crossed on the same ball; at most one
/// milestone is reported per call.
pub fn detect_milestone(old_score: u32, new_score: u32) -> Option<u32> {
    if old_score < HALF_CENTURY && new_score >= HALF_CENTURY {
        return Some(HALF_CENTURY);
    }

    let old_hundreds = old_score / CENTURY;
    let new_hundreds = new_score / CENTURY;
    if new_hundreds > old_hundreds {
        return Some(new_hundreds * CENTURY);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_century() {
        assert_eq!(detect_milestone(48, 54), Some(50));
        assert_eq!(detect_milestone(49, 50), Some(50));
        assert_eq!(detect_milestone(50, 55), None);
    }

    #[test]
    fn centuries() {
        assert_eq!(detect_milestone(95, 101), Some(100));
        assert_eq!(detect_milestone(199, 205), Some(200));
        assert_eq!(detect_milestone(296, 300), Some(300));
    }

    #[test]
    fn nothing_between_marks() {
        assert_eq!(detect_milestone(150, 199), None);
        assert_eq!(detect_milestone(0, 6), None);
        assert_eq!(detect_milestone(100, 104), None);
    }

    #[test]
    fn fifty_wins_over_hundred_on_the_same_jump() {
        assert_eq!(detect_milestone(40, 120), Some(50));
    }
}
