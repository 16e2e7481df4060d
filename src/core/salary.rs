use super::rates::round_cents;
use super::types::SalaryRecord;

#[derive(Debug, Clone)]
pub struct Salary {
    pub amount: f64,
    /// Annual increase in percent.
    pub increase_rate: f64,
    pub history_until_withdrawal: Vec<SalaryRecord>,
    pub history_after_withdrawal: Vec<SalaryRecord>,
}

impl Salary {
    pub fn new(amount: f64, increase_rate: f64) -> Self {
        Self {
            amount,
            increase_rate,
            history_until_withdrawal: Vec::new(),
            history_after_withdrawal: Vec::new(),
        }
    }

    pub fn grows(&self) -> bool {
        self.amount > 0.0 && self.increase_rate > 0.0
    }

    /// Applies one year of growth and records the new amount. The year before
    /// the withdrawal age is written to both tracks so the post-withdrawal
    /// track starts from the last pre-withdrawal salary.
    pub fn apply_annual_increase(
        &mut self,
        age: u32,
        year: i32,
        reached_withdrawal_age: bool,
        withdrawal_age: u32,
    ) {
        self.amount = round_cents(self.amount * (1.0 + self.increase_rate / 100.0));
        let record = SalaryRecord {
            year,
            age,
            amount: self.amount,
        };

        if reached_withdrawal_age {
            self.history_after_withdrawal.push(record);
            return;
        }

        if withdrawal_age.checked_sub(1) == Some(age) {
            self.history_after_withdrawal.push(record.clone());
        }
        self.history_until_withdrawal.push(record);
    }
}
