use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use upkeep::{DayOfWeek, FrequencySpec, MonthlyAnchor, OccurrenceGenerator, RecurrencePreviewer};

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn day_offset() -> impl Strategy<Value = NaiveDate> {
    (0u64..2000).prop_map(|offset| base() + Days::new(offset))
}

fn weekday() -> impl Strategy<Value = DayOfWeek> {
    (0usize..7).prop_map(|i| DayOfWeek::ALL[i])
}

fn frequency_spec() -> impl Strategy<Value = FrequencySpec> {
    prop_oneof![
        (1u32..30).prop_map(|n| FrequencySpec::daily(n).unwrap()),
        (1u32..6, prop::sample::subsequence(DayOfWeek::ALL.to_vec(), 1..=7))
            .prop_map(|(n, days)| FrequencySpec::weekly(n, days).unwrap()),
        (1u32..5, 1u32..=31).prop_map(|(n, day)| {
            FrequencySpec::monthly(n, MonthlyAnchor::day_of_month(day).unwrap()).unwrap()
        }),
        (1u32..5, 1u32..=4, weekday()).prop_map(|(n, ordinal, day)| {
            FrequencySpec::monthly(n, MonthlyAnchor::nth_weekday(ordinal, day).unwrap()).unwrap()
        }),
        prop::collection::btree_set(day_offset(), 1..20)
            .prop_map(|dates| FrequencySpec::custom(dates).unwrap()),
    ]
}

proptest! {
    /// Property: two calls with the same inputs agree.
    #[test]
    fn prop_generate_is_deterministic(
        spec in frequency_spec(),
        start in day_offset(),
        count in 0usize..40,
    ) {
        let generator = OccurrenceGenerator::default();
        prop_assert_eq!(
            generator.generate(&spec, start, count),
            generator.generate(&spec, start, count)
        );
    }

    /// Property: output is strictly increasing, never before the start date,
    /// and never longer than requested.
    #[test]
    fn prop_generate_is_strictly_increasing_from_start(
        spec in frequency_spec(),
        start in day_offset(),
        count in 0usize..40,
    ) {
        let dates = OccurrenceGenerator::default().generate(&spec, start, count);
        prop_assert!(dates.len() <= count);
        prop_assert!(dates.iter().all(|d| *d >= start));
        for pair in dates.windows(2) {
            prop_assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    /// Property: resuming a rule later keeps its phase. The dates it yields
    /// are the rule's own dates from the anchor, minus the ones before the
    /// resume point.
    #[test]
    fn prop_anchored_resume_keeps_phase(
        spec in frequency_spec(),
        anchor in day_offset(),
        skip in 0u64..400,
    ) {
        let generator = OccurrenceGenerator::default();
        let from = anchor + Days::new(skip);

        let expected: Vec<NaiveDate> = generator
            .occurrences(&spec, anchor)
            .filter(|d| *d >= from)
            .take(60)
            .collect();
        let resumed: Vec<NaiveDate> = generator
            .occurrences_from(&spec, anchor, from)
            .take(expected.len())
            .collect();
        prop_assert_eq!(resumed, expected);
    }

    /// Property: a preview is the generator's prefix, capped at its count.
    #[test]
    fn prop_preview_is_generator_prefix(
        spec in frequency_spec(),
        start in day_offset(),
    ) {
        let previewer = RecurrencePreviewer::default();
        let preview = previewer.preview(&spec, start);
        let dates = OccurrenceGenerator::default().generate(&spec, start, previewer.count() + 1);

        prop_assert!(preview.dates.len() <= previewer.count());
        prop_assert_eq!(&preview.dates[..], &dates[..preview.dates.len()]);
        prop_assert_eq!(preview.has_more, dates.len() > previewer.count());
        prop_assert_eq!(preview.formatted.len(), preview.dates.len());
    }
}
