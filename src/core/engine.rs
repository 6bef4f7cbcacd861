use tracing::debug;

use super::types::{Scenario, Trajectory, TrajectoryPoint};

const DECOMPOSITION_REL_TOL: f64 = 1e-9;

/// Scenario parameters after clamping. Fractions are not re-normalised: a triple
/// that does not sum to one is used as given.
#[derive(Debug, Clone, Copy)]
struct Policy {
    initial_asset: f64,
    initial_income: f64,
    invest_fraction: f64,
    save_fraction: f64,
    consumption_fraction: f64,
    investment_return: f64,
    savings_return: f64,
    income_growth_rate: f64,
}

impl Policy {
    fn from_scenario(scenario: &Scenario) -> Self {
        Self {
            initial_asset: scenario.initial_asset.max(0.0),
            initial_income: scenario.annual_income_initial.max(0.0),
            invest_fraction: clamp_fraction(scenario.invest_fraction),
            save_fraction: clamp_fraction(scenario.save_fraction),
            consumption_fraction: clamp_fraction(scenario.consumption_fraction),
            investment_return: scenario.annual_return_investment,
            savings_return: scenario.annual_return_savings,
            income_growth_rate: scenario.income_growth_rate,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Accounts {
    investment: f64,
    savings: f64,
}

impl Accounts {
    fn total(self) -> f64 {
        self.investment + self.savings
    }
}

#[derive(Debug, Clone, Copy)]
struct ContributionFlow {
    investment: f64,
    savings: f64,
}

/// Where the money came from. The lump sum is tracked as if it sat entirely in
/// the investment vehicle, whatever its actual split.
#[derive(Debug, Clone, Copy)]
struct Attribution {
    initial_asset: f64,
    income_investment: f64,
    income_savings: f64,
}

impl Attribution {
    fn income_total(self) -> f64 {
        self.income_investment + self.income_savings
    }

    fn advance(&mut self, policy: &Policy, flow: ContributionFlow) {
        self.initial_asset *= 1.0 + policy.investment_return;
        self.income_investment =
            self.income_investment * (1.0 + policy.investment_return) + flow.investment;
        self.income_savings = self.income_savings * (1.0 + policy.savings_return) + flow.savings;
    }
}

/// Projects a scenario forward one year at a time, nominal only.
///
/// Index 0 is the starting instant: the initial asset is split by the invest and
/// save fractions, and whatever the consumption fraction governs is not held in
/// either account. Each later year grows last year's balances, grows income, and
/// then adds the unconsumed share of this year's income, split by the same invest
/// and save fractions. `inflation_rate` is ignored.
///
/// A zero-year horizon yields the single starting point.
pub fn project(scenario: &Scenario) -> Trajectory {
    let policy = Policy::from_scenario(scenario);
    let mut trajectory = Trajectory::with_capacity(scenario.years as usize + 1);

    let mut accounts = Accounts {
        investment: policy.initial_asset * policy.invest_fraction,
        savings: policy.initial_asset * policy.save_fraction,
    };
    let mut attribution = Attribution {
        initial_asset: accounts.total(),
        income_investment: 0.0,
        income_savings: 0.0,
    };
    let mut income = policy.initial_income;

    trajectory.push(trace_point(
        0,
        scenario.starting_age,
        accounts,
        income,
        attribution,
    ));

    for year in 1..=scenario.years {
        apply_growth(&policy, &mut accounts);
        income *= 1.0 + policy.income_growth_rate;
        let flow = apply_contributions(&policy, &mut accounts, income);
        attribution.advance(&policy, flow);

        trajectory.push(trace_point(
            year,
            scenario.starting_age,
            accounts,
            income,
            attribution,
        ));
    }

    let max_gap = max_relative_decomposition_gap(&trajectory);
    if max_gap > DECOMPOSITION_REL_TOL {
        debug!(
            label = %scenario.label,
            max_gap,
            "lump-sum attribution diverges from account balances"
        );
    }
    debug!(
        label = %scenario.label,
        years = scenario.years,
        final_total = trajectory.total_assets.last().copied().unwrap_or(0.0),
        "projected scenario"
    );

    trajectory
}

fn clamp_fraction(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn apply_growth(policy: &Policy, accounts: &mut Accounts) {
    accounts.investment *= 1.0 + policy.investment_return;
    accounts.savings *= 1.0 + policy.savings_return;
}

fn apply_contributions(policy: &Policy, accounts: &mut Accounts, income: f64) -> ContributionFlow {
    let leftover = income * (1.0 - policy.consumption_fraction);
    let flow = ContributionFlow {
        investment: leftover * policy.invest_fraction,
        savings: leftover * policy.save_fraction,
    };
    accounts.investment += flow.investment;
    accounts.savings += flow.savings;
    flow
}

fn trace_point(
    year: u32,
    starting_age: u32,
    accounts: Accounts,
    income: f64,
    attribution: Attribution,
) -> TrajectoryPoint {
    TrajectoryPoint {
        t: year,
        age: starting_age.saturating_add(year),
        total_assets: accounts.total(),
        investment_account: accounts.investment,
        savings_account: accounts.savings,
        income,
        initial_asset_only: attribution.initial_asset,
        income_contribution_only_inv: attribution.income_investment,
        income_contribution_only_sav: attribution.income_savings,
        income_contribution_only: attribution.income_total(),
    }
}

/// Largest `|gap| / max(|total|, 1)` over the trajectory.
pub(crate) fn max_relative_decomposition_gap(trajectory: &Trajectory) -> f64 {
    (0..trajectory.len())
        .filter_map(|idx| {
            let gap = trajectory.decomposition_gap(idx)?;
            Some(gap.abs() / trajectory.total_assets[idx].abs().max(1.0))
        })
        .fold(0.0, f64::max)
}
