//! Balance and report DTOs

use chrono::NaiveDate;
use core_kernel::Money;
use domain_inventory::{InventoryPosition, SalesLine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// Stock account, defaults to the main stock account
    pub account: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Report date, inclusive; defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct InventoryReportResponse {
    pub date: NaiveDate,
    pub positions: Vec<InventoryPosition>,
    pub total_value: Money,
}

impl InventoryReportResponse {
    pub fn new(date: NaiveDate, positions: Vec<InventoryPosition>) -> Self {
        let total_value = positions.iter().map(|p| p.value).sum();
        Self {
            date,
            positions,
            total_value,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SalesReportQuery {
    /// First day of the period, inclusive
    pub from: NaiveDate,
    /// Last day of the period, inclusive
    pub to: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SalesReportResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub lines: Vec<SalesLine>,
    pub total_revenue: Money,
}

impl SalesReportResponse {
    pub fn new(from: NaiveDate, to: NaiveDate, lines: Vec<SalesLine>) -> Self {
        let total_revenue = lines.iter().map(|l| l.revenue).sum();
        Self {
            from,
            to,
            lines,
            total_revenue,
        }
    }
}
