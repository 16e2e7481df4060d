use chrono::{Datelike, Months, NaiveDate};

use super::types::{HousingLoan, YearMonth};

/// Whole months between `birth` and `on`, counting a month only once the
/// day of the month has been reached.
pub fn age_in_months(birth: NaiveDate, on: NaiveDate) -> i64 {
    let mut months = i64::from(on.year() - birth.year()) * 12 + i64::from(on.month0())
        - i64::from(birth.month0());
    if on.day() < birth.day() {
        months -= 1;
    }
    months
}

/// Age in whole years on the monthly clock. The birthday counts from the
/// first of the birth month, the same month `advance_one_month` ages the
/// person in.
fn age_on_clock(birth: NaiveDate, on: NaiveDate) -> u32 {
    let years = on.year() - birth.year() - i32::from(on.month() < birth.month());
    u32::try_from(years).unwrap_or(0)
}

fn months_between(from: YearMonth, to: YearMonth) -> i64 {
    (i64::from(to.year) - i64::from(from.year)) * 12 + i64::from(to.month)
        - i64::from(from.month)
}

#[derive(Debug, Clone)]
struct HousingSchedule {
    starts: YearMonth,
    lump_sum: Option<f64>,
    monthly_payment: f64,
    payments_remaining: u32,
}

#[derive(Debug, Clone)]
pub struct Person {
    pub birth_date: NaiveDate,
    pub date: NaiveDate,
    pub age: u32,
    pub age_in_months: i64,
    pub months_until_withdrawal: i64,
    pub reached_withdrawal_age: bool,
    housing: Option<HousingSchedule>,
}

impl Person {
    pub fn new(
        birth_date: NaiveDate,
        start_date: NaiveDate,
        withdrawal_age: u32,
        housing: Option<&HousingLoan>,
    ) -> Self {
        let age_months = age_in_months(birth_date, start_date);
        let date = start_date.with_day(1).unwrap_or(start_date);
        let housing = housing.map(|loan| {
            let starts = YearMonth::from(loan.date);
            // Payments due before the clock starts are already behind us.
            let elapsed = months_between(starts, YearMonth::from(date)).max(0);
            let tenure = loan.tenure_years.saturating_mul(12);
            HousingSchedule {
                starts,
                lump_sum: (loan.lump_sum > 0.0).then_some(loan.lump_sum),
                monthly_payment: loan.monthly_payment,
                payments_remaining: if loan.monthly_payment > 0.0 {
                    tenure.saturating_sub(u32::try_from(elapsed).unwrap_or(u32::MAX))
                } else {
                    0
                },
            }
        });

        Self {
            birth_date,
            date,
            age: age_on_clock(birth_date, date),
            age_in_months: age_months,
            months_until_withdrawal: i64::from(withdrawal_age) * 12 - age_months,
            reached_withdrawal_age: false,
            housing,
        }
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::from(self.date)
    }

    /// Moves the clock to the next month. Returns `false`, leaving the
    /// clock where it is, once the calendar cannot go any further.
    pub fn advance_one_month(&mut self) -> bool {
        let Some(next) = self.date.checked_add_months(Months::new(1)) else {
            return false;
        };
        self.date = next;
        if self.date.month() == self.birth_date.month() {
            self.age += 1;
        }
        true
    }

    pub fn mark_withdrawal_age_reached(&mut self) {
        self.reached_withdrawal_age = true;
    }

    /// The lump sum, if it is scheduled for the current month. It is handed
    /// out at most once.
    pub fn take_due_housing_loan(&mut self) -> Option<f64> {
        let now = self.year_month();
        let schedule = self.housing.as_mut()?;
        if schedule.starts != now {
            return None;
        }
        schedule.lump_sum.take()
    }

    pub fn take_due_housing_payment(&mut self) -> Option<f64> {
        let now = self.year_month();
        let schedule = self.housing.as_mut()?;
        if now < schedule.starts || schedule.payments_remaining == 0 {
            return None;
        }
        schedule.payments_remaining -= 1;
        Some(schedule.monthly_payment)
    }
}
