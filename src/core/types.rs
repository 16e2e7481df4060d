use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

use super::rates::CpfPolicy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bonus {
    /// Bonus size as a multiple of the monthly salary.
    pub months: f64,
    /// Calendar month (1-12) the bonus is paid in.
    pub month: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HousingLoan {
    pub date: NaiveDate,
    pub lump_sum: f64,
    pub monthly_payment: f64,
    pub tenure_years: u32,
}

#[derive(Debug, Clone)]
pub struct Inputs {
    pub start_date: NaiveDate,
    pub birth_date: NaiveDate,
    pub ordinary_start: f64,
    pub special_start: f64,
    pub monthly_salary: f64,
    pub salary_increase_rate: f64,
    pub bonus: Option<Bonus>,
    pub housing: Option<HousingLoan>,
    pub special_account_only: bool,
    pub policy: CpfPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Category {
    Contribution,
    Interest,
    Balance,
    Transfer,
    Housing,
}

/// One line of the account ledger. `Balance` rows carry balances, every other
/// category carries the change applied in that month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub date: YearMonth,
    pub category: Category,
    pub ordinary: f64,
    pub special: f64,
    pub retirement: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRecord {
    pub year: i32,
    pub age: u32,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub ordinary: f64,
    pub special: f64,
    pub retirement: f64,
    pub ordinary_at_withdrawal: f64,
    pub special_at_withdrawal: f64,
}

impl Balances {
    pub fn total(&self) -> f64 {
        self.ordinary + self.special + self.retirement
    }
}

/// Problems found while simulating, one slot per input field that can cause
/// them. A populated slot does not stop the forecast.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing_loan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing_payment: Option<String>,
}

impl ForecastErrors {
    pub fn is_empty(&self) -> bool {
        self.housing_loan.is_none() && self.housing_payment.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub balances: Balances,
    pub history_until_withdrawal: Vec<HistoryEntry>,
    pub history_after_withdrawal: Vec<HistoryEntry>,
    pub salary_history_until_withdrawal: Vec<SalaryRecord>,
    pub salary_history_after_withdrawal: Vec<SalaryRecord>,
    pub months_until_withdrawal: u32,
    pub monthly_salary: f64,
    pub comparison_values: Option<Balances>,
    pub errors: ForecastErrors,
}
