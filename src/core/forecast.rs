use chrono::{Datelike, NaiveDate};

use super::engine::ForecastEngine;
use super::types::{ForecastResult, Inputs};

pub fn months_to_year_end(date: NaiveDate) -> u32 {
    11 - date.month0()
}

/// Splits `total` months starting at `date` into the rest of the current
/// calendar year, whole calendar years, and the leftover months, so that
/// interest postings line up with year ends.
pub fn phase_legs(date: NaiveDate, total: u32) -> [u32; 3] {
    let first = months_to_year_end(date).min(total);
    let rest = total - first;
    [first, rest / 12 * 12, rest % 12]
}

fn advance_through(engine: &mut ForecastEngine, total: u32) {
    for leg in phase_legs(engine.person().date, total) {
        engine.advance_months(leg);
    }
}

fn simulate(inputs: &Inputs, special_account_only: bool) -> ForecastEngine {
    let mut engine = ForecastEngine::new(inputs, special_account_only);

    let before_withdrawal = engine.person().months_until_withdrawal.max(0);
    advance_through(&mut engine, u32::try_from(before_withdrawal).unwrap_or(u32::MAX));
    engine.transfer_at_withdrawal();

    let age_at_transfer = engine.person().age_in_months + before_withdrawal;
    let after_withdrawal = (inputs.policy.payout_age_in_months() - age_at_transfer).max(0);
    advance_through(&mut engine, u32::try_from(after_withdrawal).unwrap_or(u32::MAX));

    engine
}

/// Projects the accounts from `inputs.start_date` to the payout age. With
/// `special_account_only`, the unmodified scenario is run as well and its
/// final balances are returned as `comparison_values`.
pub fn run_forecast(inputs: &Inputs) -> ForecastResult {
    let engine = simulate(inputs, inputs.special_account_only);
    let comparison_values = inputs
        .special_account_only
        .then(|| simulate(inputs, false).balances());

    let result = engine.into_result(comparison_values);
    log::info!(
        "forecast from {}: {} months to withdrawal, final total {:.2}, {} issue(s)",
        inputs.start_date,
        result.months_until_withdrawal,
        result.balances.total(),
        usize::from(result.errors.housing_loan.is_some())
            + usize::from(result.errors.housing_payment.is_some()),
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::CpfPolicy;
    use crate::core::types::{Category, HistoryEntry, HousingLoan};
    use chrono::Months;
    use proptest::prelude::{prop_assert, proptest};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn inputs_for_age(start: NaiveDate, years: u32) -> Inputs {
        Inputs {
            start_date: start,
            birth_date: start
                .checked_sub_months(Months::new(years * 12))
                .expect("valid birth date"),
            ordinary_start: 1_000.0,
            special_start: 1_000.0,
            monthly_salary: 1_000.0,
            salary_increase_rate: 1.0,
            bonus: None,
            housing: None,
            special_account_only: false,
            policy: CpfPolicy::default(),
        }
    }

    fn interest_total(history: &[HistoryEntry]) -> f64 {
        history
            .iter()
            .filter(|e| e.category == Category::Interest)
            .map(|e| e.ordinary + e.special + e.retirement.unwrap_or(0.0))
            .sum()
    }

    #[test]
    fn phase_legs_align_with_calendar_years() {
        assert_eq!(phase_legs(date(2024, 10, 5), 40), [2, 36, 2]);
        assert_eq!(phase_legs(date(2024, 10, 5), 1), [1, 0, 0]);
        assert_eq!(phase_legs(date(2024, 12, 1), 30), [0, 24, 6]);
        assert_eq!(phase_legs(date(2024, 1, 1), 11), [11, 0, 0]);
        assert_eq!(phase_legs(date(2024, 1, 1), 0), [0, 0, 0]);
    }

    #[test]
    fn plain_forecast_has_no_comparison() {
        let inputs = inputs_for_age(date(2025, 6, 15), 16);
        let result = run_forecast(&inputs);

        assert!(result.comparison_values.is_none());
        assert_eq!(result.months_until_withdrawal, (55 - 16) * 12);
        assert!(result.errors.is_empty());
        assert!(result.balances.retirement > 0.0);
        assert!(result.monthly_salary > 1_000.0);
    }

    #[test]
    fn special_account_only_forecast_carries_unmodified_comparison() {
        let mut inputs = inputs_for_age(date(2025, 6, 15), 16);
        let plain = run_forecast(&inputs);

        inputs.special_account_only = true;
        let reallocated = run_forecast(&inputs);

        let comparison = reallocated.comparison_values.expect("comparison present");
        assert_eq!(comparison, plain.balances);
        assert_eq!(reallocated.balances.ordinary_at_withdrawal, 0.0);
        assert!(reallocated.balances.special_at_withdrawal > plain.balances.special_at_withdrawal);
    }

    #[test]
    fn post_withdrawal_phase_spans_ten_years() {
        let inputs = inputs_for_age(date(2025, 6, 15), 40);
        let result = run_forecast(&inputs);

        let transfer = &result.history_after_withdrawal[0];
        assert_eq!(transfer.category, Category::Transfer);
        assert_eq!(transfer.date.to_string(), "2040-06");
        let last = result.history_after_withdrawal.last().expect("history");
        assert_eq!(last.date.to_string(), "2050-06");
        assert_eq!(last.category, Category::Balance);
    }

    #[test]
    fn salary_tracks_overlap_at_year_before_withdrawal() {
        let inputs = inputs_for_age(date(2025, 6, 15), 40);
        let result = run_forecast(&inputs);

        let anchor = result
            .salary_history_until_withdrawal
            .iter()
            .find(|r| r.age == 54)
            .expect("age 54 record");
        assert_eq!(result.salary_history_after_withdrawal.first(), Some(anchor));
        assert!(
            result
                .salary_history_after_withdrawal
                .iter()
                .skip(1)
                .all(|r| r.age >= 55)
        );
    }

    #[test]
    fn start_in_birth_month_before_birthday_keeps_the_salary_anchor() {
        let mut inputs = inputs_for_age(date(2025, 6, 15), 35);
        inputs.birth_date = date(1990, 6, 20);
        let result = run_forecast(&inputs);

        assert_eq!(result.months_until_withdrawal, 55 * 12 - (35 * 12 - 1));
        assert_eq!(result.history_after_withdrawal[0].date.to_string(), "2045-07");
        let anchor = result
            .salary_history_until_withdrawal
            .last()
            .expect("pre-withdrawal salary history");
        assert_eq!((anchor.year, anchor.age), (2045, 54));
        assert_eq!(result.salary_history_after_withdrawal.first(), Some(anchor));
        assert_eq!(
            result.salary_history_after_withdrawal.get(1).map(|r| (r.year, r.age)),
            Some((2046, 55))
        );
    }

    #[test]
    fn forecast_running_off_the_calendar_ends_without_panicking() {
        let start = NaiveDate::MAX
            .checked_sub_months(Months::new(2))
            .expect("two months before the end");
        let inputs = inputs_for_age(start, 30);
        let result = run_forecast(&inputs);

        assert_eq!(result.months_until_withdrawal, 25 * 12);
        assert_eq!(
            result.history_after_withdrawal[0].category,
            Category::Transfer
        );
        assert!(result.balances.total() > 0.0);
    }

    #[test]
    fn person_past_withdrawal_age_transfers_immediately() {
        let inputs = inputs_for_age(date(2025, 6, 15), 60);
        let result = run_forecast(&inputs);

        assert_eq!(result.months_until_withdrawal, 0);
        assert!(result.history_until_withdrawal.is_empty());
        assert_eq!(
            result.history_after_withdrawal[0].category,
            Category::Transfer
        );
        assert_eq!(
            result.history_after_withdrawal.last().map(|e| e.date.to_string()),
            Some("2030-06".to_string())
        );
    }

    #[test]
    fn housing_shortfall_is_returned_with_the_forecast() {
        let mut inputs = inputs_for_age(date(2025, 6, 15), 30);
        inputs.housing = Some(HousingLoan {
            date: date(2026, 1, 1),
            lump_sum: 1_000_000.0,
            monthly_payment: 0.0,
            tenure_years: 0,
        });
        let result = run_forecast(&inputs);
        assert!(result.errors.housing_loan.is_some());
        assert!(result.balances.total() > 0.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_without_salary_only_interest_changes_total(
            age in 18u32..70,
            start_month in 1u32..=12,
            ordinary in 0u32..400_000,
            special in 0u32..300_000,
            special_account_only in proptest::bool::ANY
        ) {
            let mut inputs = inputs_for_age(date(2025, start_month, 10), age);
            inputs.monthly_salary = 0.0;
            inputs.salary_increase_rate = 0.0;
            inputs.ordinary_start = ordinary as f64;
            inputs.special_start = special as f64;
            inputs.special_account_only = special_account_only;

            let result = run_forecast(&inputs);
            let interest = interest_total(&result.history_until_withdrawal)
                + interest_total(&result.history_after_withdrawal);
            let expected = inputs.ordinary_start + inputs.special_start + interest;
            prop_assert!((result.balances.total() - expected).abs() <= 1e-4);
            prop_assert!(result.balances.ordinary >= 0.0);
        }
    }
}
