#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub ordinary: f64,
    pub special: f64,
}

const fn allocation(ordinary: f64, special: f64) -> Allocation {
    Allocation { ordinary, special }
}

// (highest age in band, share of wage to OA / SA)
const ALLOCATION_BANDS: [(u32, Allocation); 6] = [
    (35, allocation(0.23, 0.06)),
    (45, allocation(0.21, 0.07)),
    (50, allocation(0.19, 0.08)),
    (55, allocation(0.15, 0.115)),
    (60, allocation(0.12, 0.035)),
    (65, allocation(0.035, 0.025)),
];

const OLDEST_BAND: Allocation = allocation(0.01, 0.01);

pub fn allocation_for_age(age: u32) -> Allocation {
    ALLOCATION_BANDS
        .iter()
        .find(|(max_age, _)| age <= *max_age)
        .map(|(_, share)| *share)
        .unwrap_or(OLDEST_BAND)
}

/// Annual interest rates and the balance caps the bonus tiers apply to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterestRates {
    pub ordinary: f64,
    pub special: f64,
    pub retirement: f64,
    /// Extra rate on the bonus-eligible balance (the only bonus tier before
    /// the withdrawal age, the second tier after it).
    pub bonus: f64,
    /// Extra rate on the first tier after the withdrawal age.
    pub extra_bonus: f64,
    pub bonus_cap: f64,
    pub extra_bonus_cap: f64,
    pub ordinary_bonus_cap: f64,
}

const INTEREST_RATES: InterestRates = InterestRates {
    ordinary: 0.025,
    special: 0.04,
    retirement: 0.04,
    bonus: 0.01,
    extra_bonus: 0.02,
    bonus_cap: 60_000.0,
    extra_bonus_cap: 30_000.0,
    ordinary_bonus_cap: 20_000.0,
};

pub fn interest_rates() -> &'static InterestRates {
    &INTEREST_RATES
}

pub fn monthly(annual_rate: f64) -> f64 {
    annual_rate / 12.0
}

/// Half-up rounding to cents.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpfPolicy {
    pub withdrawal_age: u32,
    pub payout_age: u32,
    pub full_retirement_sum: f64,
    /// Dollar increase of the full retirement sum per year from the present.
    pub full_retirement_sum_increase: f64,
    pub ordinary_wage_ceiling: f64,
    pub annual_wage_ceiling: f64,
}

impl Default for CpfPolicy {
    fn default() -> Self {
        Self {
            withdrawal_age: 55,
            payout_age: 65,
            full_retirement_sum: 192_000.0,
            full_retirement_sum_increase: 6_000.0,
            ordinary_wage_ceiling: 6_000.0,
            annual_wage_ceiling: 102_000.0,
        }
    }
}

impl CpfPolicy {
    pub fn full_retirement_sum_in(&self, years_from_present: u32) -> f64 {
        self.full_retirement_sum + self.full_retirement_sum_increase * years_from_present as f64
    }

    pub fn payout_age_in_months(&self) -> i64 {
        i64::from(self.payout_age) * 12
    }
}
