use thiserror::Error;

use super::rates::{InterestRates, monthly, round_cents};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    PreWithdrawal,
    PostWithdrawal,
}

/// Interest earned during the year but not yet credited.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accrued {
    pub ordinary: f64,
    pub special: f64,
    pub retirement: f64,
}

impl Accrued {
    fn is_zero(&self) -> bool {
        self.ordinary == 0.0 && self.special == 0.0 && self.retirement == 0.0
    }

    pub fn total(&self) -> f64 {
        self.ordinary + self.special + self.retirement
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    pub from_ordinary: f64,
    pub from_special: f64,
}

impl Transfer {
    pub fn total(&self) -> f64 {
        self.from_ordinary + self.from_special
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("housing withdrawal of ${requested:.2} exceeds the ${available:.2} in the ordinary account")]
pub struct InsufficientOrdinary {
    pub requested: f64,
    pub available: f64,
}

#[derive(Debug, Clone)]
pub struct Accounts {
    pub ordinary: f64,
    pub special: f64,
    pub retirement: f64,
    pub ordinary_at_withdrawal: f64,
    pub special_at_withdrawal: f64,
    pub accrued: Accrued,
    pub phase: Phase,
    special_account_only: bool,
}

impl Accounts {
    pub fn new(ordinary: f64, special: f64, special_account_only: bool) -> Self {
        let (ordinary, special) = if special_account_only {
            (0.0, ordinary + special)
        } else {
            (ordinary, special)
        };
        Self {
            ordinary,
            special,
            retirement: 0.0,
            ordinary_at_withdrawal: 0.0,
            special_at_withdrawal: 0.0,
            accrued: Accrued::default(),
            phase: Phase::PreWithdrawal,
            special_account_only,
        }
    }

    pub fn total(&self) -> f64 {
        self.ordinary + self.special + self.retirement
    }

    /// Credits a month's contribution and returns what each account received.
    pub fn contribute(&mut self, ordinary: f64, special: f64) -> (f64, f64) {
        let credited = if self.special_account_only {
            (0.0, ordinary + special)
        } else {
            (ordinary, special)
        };
        self.ordinary += credited.0;
        self.special += credited.1;
        credited
    }

    pub fn withdraw_ordinary(&mut self, amount: f64) -> Result<(), InsufficientOrdinary> {
        if amount > self.ordinary {
            return Err(InsufficientOrdinary {
                requested: amount,
                available: self.ordinary,
            });
        }
        self.ordinary -= amount;
        Ok(())
    }

    /// Moves up to `target` into the retirement account, draining the special
    /// account before the ordinary one. Runs at most once.
    pub fn transfer_at_withdrawal(&mut self, target: f64) -> Option<Transfer> {
        if self.phase == Phase::PostWithdrawal {
            return None;
        }
        self.ordinary_at_withdrawal = self.ordinary;
        self.special_at_withdrawal = self.special;

        let target = target.max(0.0);
        let from_special = self.special.min(target).max(0.0);
        let from_ordinary = self.ordinary.min(target - from_special).max(0.0);

        self.special -= from_special;
        self.ordinary -= from_ordinary;
        self.retirement += from_special + from_ordinary;
        self.phase = Phase::PostWithdrawal;

        Some(Transfer {
            from_ordinary,
            from_special,
        })
    }

    pub fn accrue_monthly_interest(&mut self, rates: &InterestRates) {
        let ordinary_base = round_cents(self.ordinary * monthly(rates.ordinary));
        self.accrued.ordinary += ordinary_base;

        match self.phase {
            Phase::PreWithdrawal => self.accrue_pre_withdrawal(rates),
            Phase::PostWithdrawal => self.accrue_post_withdrawal(rates),
        }
    }

    fn accrue_pre_withdrawal(&mut self, rates: &InterestRates) {
        let pool = (rates.bonus_cap - self.retirement).max(0.0);

        let ordinary_eligible = self.ordinary.min(rates.ordinary_bonus_cap).min(pool).max(0.0);
        // OA bonus is paid into the SA.
        let ordinary_bonus = round_cents(ordinary_eligible * monthly(rates.bonus));

        let special_eligible = self.special.min(pool - ordinary_eligible).max(0.0);
        let special_bonus =
            round_cents(special_eligible * monthly(rates.special + rates.bonus));
        let special_plain =
            round_cents((self.special - special_eligible).max(0.0) * monthly(rates.special));

        self.accrued.special += ordinary_bonus + special_bonus + special_plain;
    }

    fn accrue_post_withdrawal(&mut self, rates: &InterestRates) {
        let second_tier_cap = rates.bonus_cap - rates.extra_bonus_cap;

        let retirement = self.retirement.max(0.0);
        let retirement_extra = retirement.min(rates.extra_bonus_cap);
        let retirement_bonus = (retirement - retirement_extra).min(second_tier_cap);
        let retirement_plain = retirement - retirement_extra - retirement_bonus;
        let retirement_interest = round_cents(
            retirement_extra * monthly(rates.retirement + rates.extra_bonus),
        ) + round_cents(retirement_bonus * monthly(rates.retirement + rates.bonus))
            + round_cents(retirement_plain * monthly(rates.retirement));

        let pool = (rates.bonus_cap - retirement).max(0.0);
        let mut extra_left = (rates.extra_bonus_cap - retirement).max(0.0);

        let ordinary_eligible = self.ordinary.min(rates.ordinary_bonus_cap).min(pool).max(0.0);
        let ordinary_extra = ordinary_eligible.min(extra_left);
        extra_left -= ordinary_extra;
        let ordinary_bonus = ordinary_eligible - ordinary_extra;
        // OA bonus is paid into the RA after the withdrawal age.
        let ordinary_bonus_interest = round_cents(ordinary_extra * monthly(rates.extra_bonus))
            + round_cents(ordinary_bonus * monthly(rates.bonus));

        let special = self.special.max(0.0);
        let special_eligible = special.min(pool - ordinary_eligible).max(0.0);
        let special_extra = special_eligible.min(extra_left);
        let special_bonus = special_eligible - special_extra;
        let special_plain = special - special_eligible;
        let special_interest = round_cents(
            special_extra * monthly(rates.special + rates.extra_bonus),
        ) + round_cents(special_bonus * monthly(rates.special + rates.bonus))
            + round_cents(special_plain * monthly(rates.special));

        self.accrued.special += special_interest;
        self.accrued.retirement += retirement_interest + ordinary_bonus_interest;
    }

    /// Credits accrued interest to the balances and clears the buckets.
    /// Returns what was credited, or `None` if nothing had accrued.
    pub fn post_accrued_interest(&mut self) -> Option<Accrued> {
        if self.accrued.is_zero() {
            return None;
        }
        let posted = self.accrued;
        self.ordinary += posted.ordinary;
        self.special += posted.special;
        self.retirement += posted.retirement;
        self.accrued = Accrued::default();
        Some(posted)
    }
}
