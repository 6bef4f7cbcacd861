use std::fmt;

use serde::Serialize;

/// How a parameter is rendered to a human.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Money,
    Percent,
    Count,
}

/// Every comparable scenario parameter. The label is identity, not a parameter.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioField {
    InitialAsset,
    AnnualIncomeInitial,
    InvestFraction,
    SaveFraction,
    ConsumptionFraction,
    AnnualReturnInvestment,
    AnnualReturnSavings,
    IncomeGrowthRate,
    InflationRate,
    Years,
    StartingAge,
}

impl ScenarioField {
    pub const ALL: [ScenarioField; 11] = [
        ScenarioField::InitialAsset,
        ScenarioField::AnnualIncomeInitial,
        ScenarioField::InvestFraction,
        ScenarioField::SaveFraction,
        ScenarioField::ConsumptionFraction,
        ScenarioField::AnnualReturnInvestment,
        ScenarioField::AnnualReturnSavings,
        ScenarioField::IncomeGrowthRate,
        ScenarioField::InflationRate,
        ScenarioField::Years,
        ScenarioField::StartingAge,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScenarioField::InitialAsset => "initial_asset",
            ScenarioField::AnnualIncomeInitial => "annual_income_initial",
            ScenarioField::InvestFraction => "invest_fraction",
            ScenarioField::SaveFraction => "save_fraction",
            ScenarioField::ConsumptionFraction => "consumption_fraction",
            ScenarioField::AnnualReturnInvestment => "annual_return_investment",
            ScenarioField::AnnualReturnSavings => "annual_return_savings",
            ScenarioField::IncomeGrowthRate => "income_growth_rate",
            ScenarioField::InflationRate => "inflation_rate",
            ScenarioField::Years => "years",
            ScenarioField::StartingAge => "starting_age",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            ScenarioField::InitialAsset | ScenarioField::AnnualIncomeInitial => FieldKind::Money,
            ScenarioField::InvestFraction
            | ScenarioField::SaveFraction
            | ScenarioField::ConsumptionFraction
            | ScenarioField::AnnualReturnInvestment
            | ScenarioField::AnnualReturnSavings
            | ScenarioField::IncomeGrowthRate
            | ScenarioField::InflationRate => FieldKind::Percent,
            ScenarioField::Years | ScenarioField::StartingAge => FieldKind::Count,
        }
    }

    /// Inflation is carried on every scenario but the projection is nominal-only,
    /// so it is never shown.
    pub fn is_displayed(self) -> bool {
        self != ScenarioField::InflationRate
    }

    /// `annual_return_investment` -> `Annual Return Investment`.
    pub fn title(self) -> String {
        self.name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ScenarioField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single parameter value. Equality is exact: `0.1 + 0.2` and `0.3` differ.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Float(f64),
    Count(u32),
}

impl ParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            ParamValue::Float(v) => v,
            ParamValue::Count(v) => f64::from(v),
        }
    }
}

// Floats keep their decimal point: `10000.0`, not `10000`.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v:?}"),
            ParamValue::Count(v) => write!(f, "{v}"),
        }
    }
}

/// One financial policy plus its horizon. Fractions and rates are decimals
/// (`0.07` is 7%).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub label: String,
    pub initial_asset: f64,
    pub annual_income_initial: f64,
    pub invest_fraction: f64,
    pub save_fraction: f64,
    pub consumption_fraction: f64,
    pub annual_return_investment: f64,
    pub annual_return_savings: f64,
    pub income_growth_rate: f64,
    pub inflation_rate: f64,
    pub years: u32,
    pub starting_age: u32,
}

impl Scenario {
    pub fn value(&self, field: ScenarioField) -> ParamValue {
        match field {
            ScenarioField::InitialAsset => ParamValue::Float(self.initial_asset),
            ScenarioField::AnnualIncomeInitial => ParamValue::Float(self.annual_income_initial),
            ScenarioField::InvestFraction => ParamValue::Float(self.invest_fraction),
            ScenarioField::SaveFraction => ParamValue::Float(self.save_fraction),
            ScenarioField::ConsumptionFraction => ParamValue::Float(self.consumption_fraction),
            ScenarioField::AnnualReturnInvestment => {
                ParamValue::Float(self.annual_return_investment)
            }
            ScenarioField::AnnualReturnSavings => ParamValue::Float(self.annual_return_savings),
            ScenarioField::IncomeGrowthRate => ParamValue::Float(self.income_growth_rate),
            ScenarioField::InflationRate => ParamValue::Float(self.inflation_rate),
            ScenarioField::Years => ParamValue::Count(self.years),
            ScenarioField::StartingAge => ParamValue::Count(self.starting_age),
        }
    }

    pub fn parameters(&self) -> impl Iterator<Item = (ScenarioField, ParamValue)> + '_ {
        ScenarioField::ALL
            .into_iter()
            .map(move |field| (field, self.value(field)))
    }

    pub fn final_age(&self) -> u32 {
        self.starting_age.saturating_add(self.years)
    }
}

/// Year-indexed balances for one scenario. Every series has `years + 1` entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    pub t: Vec<u32>,
    pub ages: Vec<u32>,
    pub total_assets: Vec<f64>,
    pub investment_account: Vec<f64>,
    pub savings_account: Vec<f64>,
    pub incomes: Vec<f64>,
    pub initial_asset_only: Vec<f64>,
    pub income_contribution_only_inv: Vec<f64>,
    pub income_contribution_only_sav: Vec<f64>,
    pub income_contribution_only: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub t: u32,
    pub age: u32,
    pub total_assets: f64,
    pub investment_account: f64,
    pub savings_account: f64,
    pub income: f64,
    pub initial_asset_only: f64,
    pub income_contribution_only_inv: f64,
    pub income_contribution_only_sav: f64,
    pub income_contribution_only: f64,
}

impl Trajectory {
    pub(crate) fn with_capacity(len: usize) -> Self {
        Self {
            t: Vec::with_capacity(len),
            ages: Vec::with_capacity(len),
            total_assets: Vec::with_capacity(len),
            investment_account: Vec::with_capacity(len),
            savings_account: Vec::with_capacity(len),
            incomes: Vec::with_capacity(len),
            initial_asset_only: Vec::with_capacity(len),
            income_contribution_only_inv: Vec::with_capacity(len),
            income_contribution_only_sav: Vec::with_capacity(len),
            income_contribution_only: Vec::with_capacity(len),
        }
    }

    pub(crate) fn push(&mut self, point: TrajectoryPoint) {
        self.t.push(point.t);
        self.ages.push(point.age);
        self.total_assets.push(point.total_assets);
        self.investment_account.push(point.investment_account);
        self.savings_account.push(point.savings_account);
        self.incomes.push(point.income);
        self.initial_asset_only.push(point.initial_asset_only);
        self.income_contribution_only_inv
            .push(point.income_contribution_only_inv);
        self.income_contribution_only_sav
            .push(point.income_contribution_only_sav);
        self.income_contribution_only
            .push(point.income_contribution_only);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn point(&self, index: usize) -> Option<TrajectoryPoint> {
        if index >= self.len() {
            return None;
        }
        Some(TrajectoryPoint {
            t: self.t[index],
            age: self.ages[index],
            total_assets: self.total_assets[index],
            investment_account: self.investment_account[index],
            savings_account: self.savings_account[index],
            income: self.incomes[index],
            initial_asset_only: self.initial_asset_only[index],
            income_contribution_only_inv: self.income_contribution_only_inv[index],
            income_contribution_only_sav: self.income_contribution_only_sav[index],
            income_contribution_only: self.income_contribution_only[index],
        })
    }

    pub fn final_point(&self) -> Option<TrajectoryPoint> {
        self.len().checked_sub(1).and_then(|idx| self.point(idx))
    }

    pub fn points(&self) -> impl Iterator<Item = TrajectoryPoint> + '_ {
        (0..self.len()).filter_map(|idx| self.point(idx))
    }

    /// `total_assets - (initial_asset_only + income_contribution_only)` at `index`.
    pub fn decomposition_gap(&self, index: usize) -> Option<f64> {
        let point = self.point(index)?;
        Some(point.total_assets - (point.initial_asset_only + point.income_contribution_only))
    }
}
