use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{optimal::OptimalCoverage, plan::PurchasePlan},
    quantity::percent::Percent,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

pub fn build_plans_table(plans: &[PurchasePlan]) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Type",
        "Commitment",
        "Purchase",
        "Current",
        "Target",
        "Savings",
        "Term",
        "Payment",
        "Token",
    ]);
    for plan in plans {
        table.add_row(vec![
            Cell::new(plan.plan_type).add_attribute(Attribute::Bold),
            Cell::new(plan.hourly_commitment).set_alignment(CellAlignment::Right),
            Cell::new(plan.purchase_percent)
                .set_alignment(CellAlignment::Right)
                .fg(Color::Green),
            Cell::new(plan.details.coverage.current).set_alignment(CellAlignment::Right).fg(
                if plan.details.coverage.current >= Percent::HUNDRED {
                    Color::Red
                } else {
                    Color::Reset
                },
            ),
            Cell::new(plan.details.coverage.target).set_alignment(CellAlignment::Right),
            Cell::new(plan.estimated_savings).set_alignment(CellAlignment::Right),
            Cell::new(plan.term),
            Cell::new(plan.payment_option),
            Cell::new(&plan.idempotency_token).add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_optimal_coverage_table(optimum: &OptimalCoverage) -> Table {
    let mut table = new_table();
    table
        .set_header(vec!["", "Hourly", "% of max", "Net savings"])
        .add_row(vec![
            Cell::new("Optimal").add_attribute(Attribute::Bold),
            Cell::new(optimum.coverage_hourly).set_alignment(CellAlignment::Right),
            Cell::new(optimum.coverage_pct_of_max).set_alignment(CellAlignment::Right),
            Cell::new(optimum.max_net_savings).set_alignment(CellAlignment::Right).fg(Color::Green),
        ])
        .add_row(vec![
            Cell::new("Minimum"),
            Cell::new(optimum.min_hourly).set_alignment(CellAlignment::Right),
            Cell::new(""),
            Cell::new(optimum.min_hourly_net_savings).set_alignment(CellAlignment::Right),
        ])
        .add_row(vec![
            Cell::new("P50 / P75 / P90").add_attribute(Attribute::Dim),
            Cell::new(""),
            Cell::new(format!(
                "{} / {} / {}",
                optimum.percentiles.p50, optimum.percentiles.p75, optimum.percentiles.p90,
            )),
            Cell::new(""),
        ]);
    table
}
