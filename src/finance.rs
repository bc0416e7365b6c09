//! Straight-line financial model for a sized system, in Indian rupees.

use serde::Serialize;
use std::fmt;

use crate::config::FinanceSettings;
use crate::pipeline::result::round_to;
use crate::pipeline::RoofCondition;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialMetrics {
    pub system_kw: f64,
    pub panels: i64,
    pub annual_kwh: i64,
    pub gross_cost: i64,
    pub net_cost: i64,
    pub annual_savings: i64,
    pub payback_years: f64,
    pub lifetime_savings: i64,
    /// Tonnes of CO2 avoided per year.
    pub co2_offset: f64,
    /// Horizon `lifetime_savings` is computed over.
    #[serde(skip)]
    pub lifetime_years: i64,
}

impl FinancialMetrics {
    pub fn subsidy(&self) -> i64 {
        self.gross_cost - self.net_cost
    }

    pub fn lifetime_label(&self) -> String {
        format!("{}-year savings", self.lifetime_years)
    }

    /// Lifetime savings as a percentage of the net cost.
    pub fn roi_percent(&self) -> i64 {
        if self.net_cost > 0 {
            (self.lifetime_savings as f64 / self.net_cost as f64 * 100.0) as i64
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FinancialCalculator {
    settings: FinanceSettings,
}

impl FinancialCalculator {
    pub fn new(settings: FinanceSettings) -> Self {
        Self { settings }
    }

    pub fn calculate(&self, system_kw: f64) -> FinancialMetrics {
        let s = &self.settings;
        let annual_kwh = (system_kw * s.sun_hours * s.performance_ratio) as i64;
        let gross_cost = (system_kw * 1000.0 * s.cost_per_watt) as i64;
        let net_cost = (gross_cost as f64 * (1.0 - s.tax_credit)) as i64;
        let annual_savings = (annual_kwh as f64 * s.electricity_rate) as i64;
        let payback_years = if annual_savings > 0 {
            round_to(net_cost as f64 / annual_savings as f64, 1)
        } else {
            0.0
        };

        FinancialMetrics {
            system_kw,
            panels: (system_kw * 1000.0 / s.panel_wattage) as i64,
            annual_kwh,
            gross_cost,
            net_cost,
            annual_savings,
            payback_years,
            lifetime_savings: annual_savings * s.lifetime_years - net_cost,
            co2_offset: round_to(annual_kwh as f64 * s.co2_per_kwh, 1),
            lifetime_years: s.lifetime_years,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    ExcellentInvestment,
    GoodPotential,
    LongerPayback,
    ConsiderImprovements,
}

impl Recommendation {
    pub fn assess(condition: RoofCondition, payback_years: f64) -> Self {
        let sound_roof = matches!(condition, RoofCondition::Excellent | RoofCondition::Good);
        if condition == RoofCondition::Excellent && payback_years < 8.0 {
            Recommendation::ExcellentInvestment
        } else if sound_roof && payback_years < 12.0 {
            Recommendation::GoodPotential
        } else if sound_roof && payback_years < 15.0 {
            Recommendation::LongerPayback
        } else {
            Recommendation::ConsiderImprovements
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::ExcellentInvestment => "Excellent investment opportunity!",
            Recommendation::GoodPotential => "Good solar potential",
            Recommendation::LongerPayback => "Good roof but longer payback - still viable",
            Recommendation::ConsiderImprovements => {
                "Viable investment - consider efficiency improvements"
            }
        })
    }
}

/// Format rupees with Indian digit grouping, e.g. `₹1,23,45,678`.
pub fn format_inr(amount: i64) -> String {
    if amount <= 0 {
        return "₹0".to_string();
    }

    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{digits}");
    }

    let (rest, last3) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = rest;
    while rest.len() > 2 {
        let (head, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = head;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();

    format!("₹{},{}", groups.join(","), last3)
}
