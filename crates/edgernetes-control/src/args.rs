use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[arg(long, env = "CONTROL_PLANE_ADDR", default_value = "0.0.0.0:50051")]
    pub listen_addr: String,

    #[arg(long, env = "STORE_DATA_DIR", default_value = "./data/control-plane-store")]
    pub data_dir: String,

    #[arg(
        long,
        env = "HEARTBEAT_INTERVAL_SECONDS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub heartbeat_interval_secs: u64,

    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub probe_timeout_secs: u64,

    #[arg(long, default_value_t = 40)]
    pub offline_after_secs: u64,

    /// Whether a manual status change also counts as a heartbeat.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub status_change_refreshes_heartbeat: bool,

    #[arg(long, env = "OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "OTLP_TOKEN")]
    pub otlp_token: Option<String>,
}
