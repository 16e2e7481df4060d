use chrono::Datelike;

use super::accounts::{Accounts, Phase};
use super::person::Person;
use super::rates::{CpfPolicy, InterestRates, allocation_for_age, interest_rates, round_cents};
use super::salary::Salary;
use super::types::{
    Balances, Bonus, Category, ForecastErrors, ForecastResult, HistoryEntry, Inputs,
};

/// Runs one scenario month by month. Each engine owns its own person, salary
/// and accounts; nothing is shared between scenarios.
#[derive(Debug)]
pub struct ForecastEngine {
    person: Person,
    salary: Salary,
    accounts: Accounts,
    bonus: Option<Bonus>,
    policy: CpfPolicy,
    rates: &'static InterestRates,
    start_year: i32,
    months_until_withdrawal: u32,
    history_until_withdrawal: Vec<HistoryEntry>,
    history_after_withdrawal: Vec<HistoryEntry>,
    errors: ForecastErrors,
}

impl ForecastEngine {
    pub fn new(inputs: &Inputs, special_account_only: bool) -> Self {
        let person = Person::new(
            inputs.birth_date,
            inputs.start_date,
            inputs.policy.withdrawal_age,
            inputs.housing.as_ref(),
        );
        let months_until_withdrawal =
            u32::try_from(person.months_until_withdrawal.max(0)).unwrap_or(u32::MAX);

        Self {
            start_year: inputs.start_date.year(),
            months_until_withdrawal,
            person,
            salary: Salary::new(inputs.monthly_salary, inputs.salary_increase_rate),
            accounts: Accounts::new(
                inputs.ordinary_start,
                inputs.special_start,
                special_account_only,
            ),
            bonus: inputs.bonus,
            policy: inputs.policy,
            rates: interest_rates(),
            history_until_withdrawal: Vec::new(),
            history_after_withdrawal: Vec::new(),
            errors: ForecastErrors::default(),
        }
    }

    pub fn person(&self) -> &Person {
        &self.person
    }

    pub fn balances(&self) -> Balances {
        Balances {
            ordinary: self.accounts.ordinary,
            special: self.accounts.special,
            retirement: self.accounts.retirement,
            ordinary_at_withdrawal: self.accounts.ordinary_at_withdrawal,
            special_at_withdrawal: self.accounts.special_at_withdrawal,
        }
    }

    /// Simulates `months` months. Interest is posted when a December rolls
    /// into January and again after the last month, so a year already posted
    /// by the previous call is never posted twice.
    pub fn advance_months(&mut self, months: u32) {
        for step in 0..months {
            if step > 0 && self.person.date.month0() == 11 {
                self.post_interest();
            }

            self.apply_housing();
            if !self.person.advance_one_month() {
                log::warn!(
                    "{} is the last representable month, stopping the forecast",
                    self.person.year_month()
                );
                self.post_interest();
                return;
            }

            if self.person.date.month() == 1 && self.salary.grows() {
                self.salary.apply_annual_increase(
                    self.person.age,
                    self.person.date.year(),
                    self.person.reached_withdrawal_age,
                    self.policy.withdrawal_age,
                );
            }

            self.accounts.accrue_monthly_interest(self.rates);
            self.contribute();

            if step + 1 == months {
                self.post_interest();
            }
        }
    }

    pub fn transfer_at_withdrawal(&mut self) {
        let years_from_present =
            u32::try_from(self.person.date.year() - self.start_year).unwrap_or(0);
        let target = self.policy.full_retirement_sum_in(years_from_present);
        self.person.mark_withdrawal_age_reached();

        if let Some(transfer) = self.accounts.transfer_at_withdrawal(target) {
            log::debug!(
                "{} withdrawal transfer: target={target:.2} from_special={:.2} from_ordinary={:.2}",
                self.person.year_month(),
                transfer.from_special,
                transfer.from_ordinary,
            );
            self.record(
                Category::Transfer,
                -transfer.from_ordinary,
                -transfer.from_special,
                transfer.total(),
            );
        }
    }

    pub fn into_result(self, comparison_values: Option<Balances>) -> ForecastResult {
        ForecastResult {
            balances: self.balances(),
            history_until_withdrawal: self.history_until_withdrawal,
            history_after_withdrawal: self.history_after_withdrawal,
            salary_history_until_withdrawal: self.salary.history_until_withdrawal,
            salary_history_after_withdrawal: self.salary.history_after_withdrawal,
            months_until_withdrawal: self.months_until_withdrawal,
            monthly_salary: self.salary.amount,
            comparison_values,
            errors: self.errors,
        }
    }

    fn post_interest(&mut self) {
        if let Some(posted) = self.accounts.post_accrued_interest() {
            self.record(
                Category::Interest,
                posted.ordinary,
                posted.special,
                posted.retirement,
            );
            self.record_balance();
        }
    }

    fn apply_housing(&mut self) {
        if let Some(amount) = self.person.take_due_housing_loan() {
            match self.accounts.withdraw_ordinary(amount) {
                Ok(()) => {
                    self.record(Category::Housing, -amount, 0.0, 0.0);
                    self.record_balance();
                }
                Err(shortfall) => {
                    log::warn!("{} housing loan skipped: {shortfall}", self.person.year_month());
                    self.errors.housing_loan = Some(shortfall.to_string());
                }
            }
        }

        if let Some(payment) = self.person.take_due_housing_payment() {
            match self.accounts.withdraw_ordinary(payment) {
                Ok(()) => {
                    self.record(Category::Housing, -payment, 0.0, 0.0);
                    self.record_balance();
                }
                Err(shortfall) => {
                    log::warn!(
                        "{} housing payment skipped: {shortfall}",
                        self.person.year_month()
                    );
                    if self.errors.housing_payment.is_none() {
                        self.errors.housing_payment = Some(format!(
                            "{} onwards: {shortfall}",
                            self.person.year_month()
                        ));
                    }
                }
            }
        }
    }

    fn contribute(&mut self) {
        let salary = self.salary.amount;
        if salary <= 0.0 {
            return;
        }

        let wage = salary.min(self.policy.ordinary_wage_ceiling);
        let mut subject_wage = wage;
        if let Some(bonus) = self.bonus {
            if bonus.month == self.person.date.month() {
                let remaining_ceiling = (self.policy.annual_wage_ceiling - wage * 12.0).max(0.0);
                subject_wage += (salary * bonus.months).clamp(0.0, remaining_ceiling);
            }
        }

        let share = allocation_for_age(self.person.age);
        let (ordinary, special) = self.accounts.contribute(
            round_cents(subject_wage * share.ordinary),
            round_cents(subject_wage * share.special),
        );
        self.record(Category::Contribution, ordinary, special, 0.0);
    }

    fn record_balance(&mut self) {
        let (ordinary, special, retirement) = (
            self.accounts.ordinary,
            self.accounts.special,
            self.accounts.retirement,
        );
        self.record(Category::Balance, ordinary, special, retirement);
    }

    fn record(&mut self, category: Category, ordinary: f64, special: f64, retirement: f64) {
        let date = self.person.year_month();
        let (history, retirement) = match self.accounts.phase {
            Phase::PreWithdrawal => (&mut self.history_until_withdrawal, None),
            Phase::PostWithdrawal => (&mut self.history_after_withdrawal, Some(retirement)),
        };
        history.push(HistoryEntry {
            date,
            category,
            ordinary,
            special,
            retirement,
        });
    }
}
