use std::{collections::HashMap, net::SocketAddr, time::Duration};

use alloy::primitives::Address;
use serde_json::{json, Value};
use tokio::{
    sync::mpsc,
    time::{interval, Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    api::{
        spec::Query,
        server::{CustodyApiServer, CustodyEvent, CustodyRequest},
    },
    bootstrap::bring_up,
    common::time::current_timestamp,
    config::Opts,
    error::CustodyError,
    telemetry::CustodyMetrics,
    CustodySystem,
};

const API_EVENTS_BUFFER_SIZE: usize = 1024;

/// The driver of the custody service, responsible for the main event loop.
///
/// It owns the [CustodySystem] and handles API events one at a time, in the order they arrive,
/// so every call observes the effects of all calls before it. A periodic tick exports a solvency
/// report for every accepted asset.
///
/// Signed requests must carry their signer's next nonce, which is consumed whether the call
/// succeeds or reverts.
#[derive(Debug)]
pub struct CustodyDriver {
    system: CustodySystem,
    api_events_rx: mpsc::Receiver<CustodyEvent>,
    report_interval: Interval,
    nonces: HashMap<Address, u64>,
}

impl CustodyDriver {
    /// Brings up the system described by `opts` and starts the JSON-RPC server.
    pub async fn from_opts(opts: &Opts) -> eyre::Result<Self> {
        let params = opts.deployment_params()?;
        let system = bring_up(&params, current_timestamp())?;

        let (api_events_tx, api_events_rx) = mpsc::channel(API_EVENTS_BUFFER_SIZE);
        let mut api_server = CustodyApiServer::new(SocketAddr::from(([0, 0, 0, 0], opts.port)));
        api_server.run(api_events_tx).await?;

        Ok(Self::new(system, api_events_rx, Duration::from_secs(opts.report_interval)))
    }

    /// Creates a driver over an already deployed system.
    pub fn new(
        system: CustodySystem,
        api_events_rx: mpsc::Receiver<CustodyEvent>,
        report_every: Duration,
    ) -> Self {
        let mut report_interval = interval(report_every.max(Duration::from_secs(1)));
        report_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self { system, api_events_rx, report_interval, nonces: HashMap::new() }
    }

    /// Run the main event loop endlessly for the custody service.
    pub async fn run_forever(mut self) -> ! {
        loop {
            tokio::select! {
                Some(api_event) = self.api_events_rx.recv() => {
                    self.handle_incoming_api_event(api_event);
                }
                _ = self.report_interval.tick() => {
                    self.report_solvency(current_timestamp());
                }
            }
        }
    }

    /// Handle an incoming API event, answering on its response channel.
    fn handle_incoming_api_event(&mut self, event: CustodyEvent) {
        let CustodyEvent { request, response } = event;

        let result = match request {
            CustodyRequest::Execute { ctx, nonce, call } => self
                .consume_nonce(ctx.caller, nonce)
                .and_then(|()| self.system.execute(&ctx, call))
                .map(|output| json!(output)),
            CustodyRequest::Query(query) => self.query(query, current_timestamp()),
        };

        if response.send(result).is_err() {
            warn!("API response channel closed before the result was delivered");
        }
    }

    /// The nonce the next signed request of `signer` must carry.
    fn nonce(&self, signer: Address) -> u64 {
        self.nonces.get(&signer).copied().unwrap_or_default()
    }

    fn consume_nonce(&mut self, signer: Address, received: u64) -> Result<(), CustodyError> {
        let expected = self.nonce(signer);
        if received != expected {
            warn!(%signer, expected, received, "Refusing request with a stale or future nonce");
            return Err(CustodyError::NonceMismatch { signer, expected, received });
        }

        let next = expected.checked_add(1).ok_or(CustodyError::Overflow)?;
        self.nonces.insert(signer, next);
        Ok(())
    }

    fn query(&self, query: Query, now: u64) -> Result<Value, CustodyError> {
        debug!(?query, "Answering query");

        let deposit = self.system.deposit_manager();
        match query {
            Query::BalanceOf { asset, holder } => Ok(json!(deposit.balance_of(asset, holder)?)),
            Query::TotalAssets(asset) => self
                .system
                .solvency_report(now)
                .into_iter()
                .find(|report| report.asset == asset)
                .map(|report| json!(report))
                .ok_or(CustodyError::UnsupportedAsset(asset)),
            Query::WrappedTokens => {
                let tokens = deposit
                    .assets()
                    .map(|config| {
                        let token = deposit.wrapped_token(config.asset.id)?;
                        Ok(json!({
                            "asset": config.asset.id,
                            "wrapped": config.wrapped,
                            "name": token.name,
                            "symbol": token.symbol,
                            "decimals": token.decimals,
                            "totalSupply": token.total_supply(),
                            "autoBridge": config.auto_bridge,
                            "l2Token": config.l2_token,
                        }))
                    })
                    .collect::<Result<Vec<_>, CustodyError>>()?;
                Ok(json!(tokens))
            }
            Query::Strategies(asset) => {
                deposit.asset(asset)?;
                Ok(json!(self.system.strategy_slots(asset, now)))
            }
            Query::Nonce(signer) => Ok(json!(self.nonce(signer))),
        }
    }

    /// Logs and exports the solvency of every accepted asset.
    fn report_solvency(&self, now: u64) {
        for report in self.system.solvency_report(now) {
            let Ok(token) = self.system.deposit_manager().wrapped_token(report.asset) else {
                continue;
            };
            CustodyMetrics::set_solvency(&report, token.decimals);

            if report.supply > report.underlying {
                warn!(
                    asset = %report.asset,
                    supply = %report.supply,
                    underlying = %report.underlying,
                    "Receipts exceed underlying"
                );
            } else {
                info!(
                    symbol = %report.symbol,
                    supply = %report.supply,
                    underlying = %report.underlying,
                    "Solvency report"
                );
            }
        }
    }
}
