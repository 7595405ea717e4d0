use time::{Date, OffsetDateTime, UtcOffset, macros::date};

use super::{CatalogError, Shape, ShapeCatalog};

const EPOCH: Date = date!(1970 - 01 - 01);

/// Whole UTC days elapsed since 1970-01-01 for the given calendar day.
pub fn days_since_epoch(day: Date) -> i64 {
    i64::from(day.to_julian_day()) - i64::from(EPOCH.to_julian_day())
}

/// Shape of the day for the UTC calendar day containing `instant`.
///
/// Time of day and the instant's own offset do not matter; the rotation
/// advances at UTC midnight.
pub fn shape_for_date(
    catalog: &ShapeCatalog,
    instant: OffsetDateTime,
) -> Result<&Shape, CatalogError> {
    shape_for_day(catalog, instant.to_offset(UtcOffset::UTC).date())
}

/// Shape of the day for a UTC calendar day.
pub fn shape_for_day(catalog: &ShapeCatalog, day: Date) -> Result<&Shape, CatalogError> {
    if catalog.is_empty() {
        return Err(CatalogError::Empty);
    }
    let len = i64::try_from(catalog.len()).map_err(|_| CatalogError::Empty)?;
    let index = days_since_epoch(day).rem_euclid(len);
    // rem_euclid keeps the index in [0, len)
    catalog
        .get(index as usize)
        .ok_or(CatalogError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn epoch_day_is_first_shape() {
        let catalog = ShapeCatalog::default();
        let shape = shape_for_day(&catalog, date!(1970 - 01 - 01)).unwrap();
        assert_eq!(shape.display_name, "Circle");
    }

    #[test]
    fn same_utc_day_same_shape_regardless_of_time_or_offset() {
        let catalog = ShapeCatalog::default();
        let morning = shape_for_date(&catalog, datetime!(2025-11-22 00:00:01 UTC)).unwrap();
        let night = shape_for_date(&catalog, datetime!(2025-11-22 23:59:59 UTC)).unwrap();
        // 08:30 at +09:00 is 23:30 UTC on the previous day
        let seoul = shape_for_date(&catalog, datetime!(2025-11-23 08:30 +09:00)).unwrap();
        assert_eq!(morning, night);
        assert_eq!(morning, seoul);
    }

    #[test]
    fn rolls_over_at_utc_midnight() {
        let catalog = ShapeCatalog::default();
        let before = shape_for_date(&catalog, datetime!(2025-11-22 23:59:59 UTC)).unwrap();
        let after = shape_for_date(&catalog, datetime!(2025-11-23 00:00:00 UTC)).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn cycles_through_whole_catalog_with_catalog_length_period() {
        let catalog = ShapeCatalog::default();
        let start = date!(2024 - 02 - 27);
        let mut seen = Vec::new();
        for offset in 0..catalog.len() as i64 {
            let day = start + time::Duration::days(offset);
            seen.push(shape_for_day(&catalog, day).unwrap().clone());
        }
        for shape in catalog.all() {
            assert_eq!(seen.iter().filter(|s| *s == shape).count(), 1);
        }
        for offset in 0..30i64 {
            let day = start + time::Duration::days(offset);
            let later = day + time::Duration::days(catalog.len() as i64);
            assert_eq!(
                shape_for_day(&catalog, day).unwrap(),
                shape_for_day(&catalog, later).unwrap()
            );
        }
    }

    #[test]
    fn dates_before_epoch_wrap_backwards() {
        let catalog = ShapeCatalog::default();
        let shape = shape_for_day(&catalog, date!(1969 - 12 - 31)).unwrap();
        assert_eq!(shape.display_name, "Donut");
    }

    #[test]
    fn empty_catalog_is_a_configuration_error() {
        let catalog = ShapeCatalog::new(Vec::new()).unwrap();
        assert_eq!(
            shape_for_day(&catalog, date!(2025 - 01 - 01)),
            Err(CatalogError::Empty)
        );
    }

    #[test]
    fn days_since_epoch_counts_whole_days() {
        assert_eq!(days_since_epoch(date!(1970 - 01 - 02)), 1);
        assert_eq!(days_since_epoch(date!(2023 - 11 - 14)), 19_675);
    }
}
