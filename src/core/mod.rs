mod accounts;
mod engine;
mod forecast;
mod format;
mod person;
mod rates;
mod salary;
mod types;

pub use accounts::{Accounts, Accrued, InsufficientOrdinary, Phase, Transfer};
pub use engine::ForecastEngine;
pub use forecast::{months_to_year_end, phase_legs, run_forecast};
pub use format::years_and_months;
pub use person::{Person, age_in_months};
pub use rates::{
    Allocation, CpfPolicy, InterestRates, allocation_for_age, interest_rates, monthly, round_cents,
};
pub use salary::Salary;
pub use types::{
    Balances, Bonus, Category, ForecastErrors, ForecastResult, HistoryEntry, HousingLoan, Inputs,
    SalaryRecord, YearMonth,
};
