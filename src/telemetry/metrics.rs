use std::time::Duration;

use alloy::primitives::{utils::format_units, U256};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use crate::{primitives::Component, system::AssetReport};

//  Counters ----------------------------------------------------------------
/// Calls submitted to the executor, by method
const CALLS: &str = "custody_calls";
/// Calls reverted, by method and error tag
const REVERTS: &str = "custody_reverts";
/// Committed deposits, by asset
const DEPOSITS: &str = "custody_deposits";
/// Committed withdrawals, by asset
const WITHDRAWALS: &str = "custody_withdrawals";
/// Committed implementation upgrades, by component
const UPGRADES: &str = "custody_upgrades";
/// Re-entrant calls rejected by the executor
const REENTRANCY_REJECTIONS: &str = "custody_reentrancy_rejections";
/// Total HTTP requests received by the API server
const HTTP_REQUESTS: &str = "custody_http_requests";

//  Gauges ------------------------------------------------------------------
/// Wrapped receipts in circulation, in whole units of the asset
const RECEIPT_SUPPLY: &str = "custody_receipt_supply";
/// Underlying held across custody and strategies, in whole units of the asset
const UNDERLYING: &str = "custody_underlying";

//  Histograms --------------------------------------------------------------
/// Duration of HTTP requests in seconds
const HTTP_REQUESTS_DURATION_SECONDS: &str = "custody_http_requests_duration_seconds";

/// Metrics for the custody service.
#[derive(Debug, Clone, Copy)]
pub struct CustodyMetrics;

#[allow(missing_docs)]
impl CustodyMetrics {
    pub fn describe_all() {
        // Counters
        describe_counter!(CALLS, "Calls submitted to the executor");
        describe_counter!(REVERTS, "Calls reverted, by error tag");
        describe_counter!(DEPOSITS, "Committed deposits");
        describe_counter!(WITHDRAWALS, "Committed withdrawals");
        describe_counter!(UPGRADES, "Committed implementation upgrades");
        describe_counter!(REENTRANCY_REJECTIONS, "Re-entrant calls rejected");
        describe_counter!(HTTP_REQUESTS, "Total HTTP requests received");

        // Gauges
        describe_gauge!(RECEIPT_SUPPLY, "Wrapped receipts in circulation");
        describe_gauge!(UNDERLYING, "Underlying held across custody and strategies");

        // Histograms
        describe_histogram!(HTTP_REQUESTS_DURATION_SECONDS, "Duration of HTTP requests in seconds");
    }

    /// Counters ----------------------------------------------------------------

    pub fn increment_calls(method: &'static str) {
        counter!(CALLS, "method" => method).increment(1);
    }

    pub fn increment_reverts(method: &'static str, reason: &'static str) {
        counter!(REVERTS, "method" => method, "reason" => reason).increment(1);
    }

    pub fn increment_deposits(asset: String) {
        counter!(DEPOSITS, "asset" => asset).increment(1);
    }

    pub fn increment_withdrawals(asset: String) {
        counter!(WITHDRAWALS, "asset" => asset).increment(1);
    }

    pub fn increment_upgrades(component: Component) {
        counter!(UPGRADES, "component" => component.to_string()).increment(1);
    }

    pub fn increment_reentrancy_rejections() {
        counter!(REENTRANCY_REJECTIONS).increment(1);
    }

    /// Gauges ----------------------------------------------------------------

    pub fn set_solvency(report: &AssetReport, decimals: u8) {
        let symbol = report.symbol.clone();
        gauge!(RECEIPT_SUPPLY, "asset" => symbol.clone()).set(units(report.supply, decimals));
        gauge!(UNDERLYING, "asset" => symbol).set(units(report.underlying, decimals));
    }

    /// Mixed ----------------------------------------------------------------

    /// Observes the duration of an HTTP request by storing it in a histogram,
    /// and incrementing the total number of HTTP requests received.
    pub fn observe_http_request(duration: Duration, path: String, status: String) {
        counter!(HTTP_REQUESTS, "path" => path.clone(), "status" => status.clone()).increment(1);
        histogram!(HTTP_REQUESTS_DURATION_SECONDS, "path" => path, "status" => status)
            .record(duration.as_secs_f64());
    }
}

/// `value` in whole units of an asset with `decimals`, as reported by gauges.
fn units(value: U256, decimals: u8) -> f64 {
    format_units(value, decimals).ok().and_then(|s| s.parse().ok()).unwrap_or_default()
}
