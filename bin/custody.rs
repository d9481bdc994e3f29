use clap::Parser;
use tracing::info;

use edgeless_custody::{
    common::CUSTODY_VERSION,
    config::{remove_empty_envs, Opts},
    telemetry::init_telemetry_stack,
    CustodyDriver,
};

const EDGELESS: &str = r#"
███████╗██████╗  ██████╗ ███████╗██╗     ███████╗███████╗███████╗
██╔════╝██╔══██╗██╔════╝ ██╔════╝██║     ██╔════╝██╔════╝██╔════╝
█████╗  ██║  ██║██║  ███╗█████╗  ██║     █████╗  ███████╗███████╗
██╔══╝  ██║  ██║██║   ██║██╔══╝  ██║     ██╔══╝  ╚════██║╚════██║
███████╗██████╔╝╚██████╔╝███████╗███████╗███████╗███████║███████║
╚══════╝╚═════╝  ╚═════╝ ╚══════╝╚══════╝╚══════╝╚══════╝╚══════╝"#;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    println!("{}", EDGELESS);

    let _ = dotenvy::dotenv();
    remove_empty_envs()?;

    let opts = Opts::try_parse()?;

    init_telemetry_stack(opts.telemetry.metrics_port())?;

    info!(version = %*CUSTODY_VERSION, port = opts.port, "Starting Edgeless custody");

    CustodyDriver::from_opts(&opts).await?.run_forever().await
}
