use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pifetch::{Credentials, DeviceFetcher, FetchError, FetchResult, PiFetchConfig, TransferSpec};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Find a device on the LAN by MAC address and download one file from it.
#[derive(Parser, Debug)]
#[command(name = "pifetch", version, about)]
struct Cli {
    /// MAC address of the device, e.g. b8:27:eb:12:34:56
    #[arg(long)]
    mac: Option<String>,

    /// Login name on the device
    #[arg(long)]
    user: Option<String>,

    /// Absolute path of the file on the device
    #[arg(long)]
    remote: Option<String>,

    /// Where to save it (default: the remote file name in the working directory)
    #[arg(long)]
    local: Option<PathBuf>,

    /// Last known address; checked with a privileged probe before scanning
    #[arg(long = "cached-ip")]
    cached_ip: Option<Ipv4Addr>,

    /// Subnet to sweep when the address has to be discovered
    #[arg(long)]
    subnet: Option<String>,

    /// SSH port
    #[arg(long)]
    port: Option<u16>,

    /// JSON configuration file
    #[arg(long, env = "PIFETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Print the fetch report as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// Device login password.
const PASSWORD_VAR: &str = "PIFETCH_PASSWORD";
/// Local sudo password, required with --cached-ip.
const ROOT_PASSWORD_VAR: &str = "PIFETCH_ROOT_PASSWORD";

impl Cli {
    /// Flags win over file values.
    fn apply_to(&self, config: &mut PiFetchConfig) {
        if let Some(mac) = &self.mac {
            config.device.mac_address = Some(mac.clone());
        }
        if let Some(user) = &self.user {
            config.device.username = Some(user.clone());
        }
        if let Some(addr) = self.cached_ip {
            config.device.cached_address = Some(addr);
        }
        if let Some(subnet) = &self.subnet {
            config.discovery.subnet = subnet.clone();
        }
        if let Some(port) = self.port {
            config.session.port = port;
        }
        if let Some(remote) = &self.remote {
            config.transfer.remote_path = Some(remote.clone());
        }
        if let Some(local) = &self.local {
            config.transfer.local_path = Some(local.clone());
        }
    }
}

/// Secrets come from the environment only; there are no flags for them, so
/// they never show up in this process's argv.
fn credentials<F>(config: &PiFetchConfig, env: F) -> FetchResult<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let user = config
        .device
        .username
        .as_deref()
        .ok_or_else(|| FetchError::config("No login name given (--user or device.username)"))?;
    let password = env(PASSWORD_VAR)
        .ok_or_else(|| FetchError::config(format!("{} is not set", PASSWORD_VAR)))?;
    let creds = Credentials::new(user, password);
    Ok(match env(ROOT_PASSWORD_VAR) {
        Some(secret) => creds.with_privileged_secret(secret),
        None => creds,
    })
}

fn transfer_spec(config: &PiFetchConfig) -> FetchResult<TransferSpec> {
    let remote = config
        .transfer
        .remote_path
        .as_deref()
        .ok_or_else(|| FetchError::config("No remote path given (--remote or transfer.remotePath)"))?;
    match &config.transfer.local_path {
        Some(local) => Ok(TransferSpec::new(remote, local)),
        None => TransferSpec::into_working_dir(remote),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> FetchResult<()> {
    let mut config = PiFetchConfig::load_or_default(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    debug!("Effective configuration: {:?}", config);

    let spec = transfer_spec(&config)?;
    let credentials = credentials(&config, |key| std::env::var(key).ok())?;
    let fetcher = DeviceFetcher::from_config(&config, credentials)?;

    let report = fetcher.fetch(&spec).await?;
    if cli.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| FetchError::internal("Failed to encode report").with_detail(e.to_string()))?;
        println!("{}", json);
    } else {
        info!(
            "Saved {} ({} bytes, sha256 {})",
            report.local_path.display(),
            report.bytes,
            report.sha256
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pifetch: {}", e);
            ExitCode::FAILURE
        }
    }
}
