/// Normalize query pagination into (page, per_page, offset).
///
/// Saturating math keeps an absurd `?page=` from overflowing the
/// offset; per_page is capped at 100 rows.
pub fn page_window(page: Option<u64>, per_page: Option<u64>, default_per_page: u64) -> (u64, u64, u64) {
    let per_page = per_page.unwrap_or(default_per_page).clamp(1, 100);
    let page = page.unwrap_or(1).max(1);
    let offset = page.saturating_sub(1).saturating_mul(per_page);
    (page, per_page, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(page_window(None, None, 10), (1, 10, 0));
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(page_window(Some(3), Some(25), 10), (3, 25, 50));
    }

    #[test]
    fn per_page_is_capped() {
        let (_, per_page, _) = page_window(Some(1), Some(10_000), 10);
        assert_eq!(per_page, 100);
    }

    #[test]
    fn zero_inputs_are_normalized() {
        assert_eq!(page_window(Some(0), Some(0), 10), (1, 1, 0));
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        let (page, per_page, offset) = page_window(Some(u64::MAX), Some(100), 10);
        assert_eq!(page, u64::MAX);
        assert_eq!(per_page, 100);
        assert_eq!(offset, u64::MAX);
    }
}
