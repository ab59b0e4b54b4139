//! Discovery tooling boundary – `nmap` and `arp` run as subprocesses.

use async_trait::async_trait;
use log::debug;
use pifetch_core::{DiscoveryConfig, FetchError, FetchResult};
use secrecy::{ExposeSecret, SecretString};
use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// The external programs the locator depends on.
///
/// Each call spawns at most one process; nothing is shared between calls.
#[async_trait]
pub trait DiscoveryTools: Send + Sync {
    /// Privileged host-discovery probe of exactly `address`. Returns the
    /// probe's standard output. `secret` must reach the process through its
    /// standard input, never its arguments.
    async fn probe_host(&self, address: Ipv4Addr, secret: &SecretString) -> FetchResult<String>;

    /// Unprivileged discovery sweep of every address in `subnet`, run only to
    /// populate the neighbor table. Output is discarded.
    async fn sweep_subnet(&self, subnet: &str) -> FetchResult<()>;

    /// Current neighbor-resolution table as text.
    async fn neighbor_table(&self) -> FetchResult<String>;
}

/// [`DiscoveryTools`] backed by the host's `sudo`, `nmap` and `arp`.
#[derive(Debug, Clone)]
pub struct SystemTools {
    config: DiscoveryConfig,
}

impl SystemTools {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// `sudo -S -p "" nmap -sn -n <address>`: `-S` reads the password from
    /// stdin, the empty prompt keeps stdout free of sudo chatter.
    pub fn probe_args(&self, address: Ipv4Addr) -> Vec<String> {
        vec![
            "-S".into(),
            "-p".into(),
            String::new(),
            self.config.nmap_path.clone(),
            "-sn".into(),
            "-n".into(),
            address.to_string(),
        ]
    }

    pub fn sweep_args(&self, subnet: &str) -> Vec<String> {
        vec!["-sn".into(), subnet.to_string()]
    }

    pub fn table_args(&self) -> Vec<String> {
        vec!["-a".into()]
    }
}

#[async_trait]
impl DiscoveryTools for SystemTools {
    async fn probe_host(&self, address: Ipv4Addr, secret: &SecretString) -> FetchResult<String> {
        let args = self.probe_args(address);
        debug!("Probing {} via {} {}", address, self.config.sudo_path, args.join(" "));

        let mut child = Command::new(&self.config.sudo_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                FetchError::discovery_tool(format!("Failed to spawn {}", self.config.sudo_path))
                    .with_detail(e.to_string())
            })?;

        // Dropping the handle closes the pipe so sudo sees EOF after one line.
        if let Some(mut stdin) = child.stdin.take() {
            let piped = async {
                stdin.write_all(secret.expose_secret().as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.flush().await
            };
            piped.await.map_err(|e| {
                FetchError::discovery_tool("Failed to pass password to sudo")
                    .with_detail(e.to_string())
            })?;
        }

        let output = run_with_timeout(
            child.wait_with_output(),
            self.config.probe_timeout(),
            &format!("probe of {}", address),
        )
        .await?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn sweep_subnet(&self, subnet: &str) -> FetchResult<()> {
        debug!("Sweeping {} with {}", subnet, self.config.nmap_path);
        let child = Command::new(&self.config.nmap_path)
            .args(self.sweep_args(subnet))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                FetchError::discovery_tool(format!("Failed to spawn {}", self.config.nmap_path))
                    .with_detail(e.to_string())
            })?;

        let output = run_with_timeout(
            child.wait_with_output(),
            self.config.sweep_timeout(),
            &format!("sweep of {}", subnet),
        )
        .await?;

        if !output.status.success() {
            return Err(FetchError::discovery_tool(format!(
                "{} exited with {} while sweeping {}",
                self.config.nmap_path, output.status, subnet
            ))
            .with_detail(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(())
    }

    async fn neighbor_table(&self) -> FetchResult<String> {
        let child = Command::new(&self.config.arp_path)
            .args(self.table_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                FetchError::discovery_tool(format!("Failed to spawn {}", self.config.arp_path))
                    .with_detail(e.to_string())
            })?;

        let output = run_with_timeout(
            child.wait_with_output(),
            self.config.probe_timeout(),
            "neighbor table dump",
        )
        .await?;

        if !output.status.success() {
            return Err(FetchError::discovery_tool(format!(
                "{} exited with {}",
                self.config.arp_path, output.status
            ))
            .with_detail(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

async fn run_with_timeout<F>(
    fut: F,
    limit: Duration,
    what: &str,
) -> FetchResult<std::process::Output>
where
    F: std::future::Future<Output = std::io::Result<std::process::Output>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(FetchError::discovery_tool(format!("Failed to wait for {}", what))
            .with_detail(e.to_string())),
        Err(_) => Err(FetchError::timeout(format!(
            "{} did not finish within {}s",
            what,
            limit.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pifetch_core::FetchErrorKind;

    fn tools() -> SystemTools {
        SystemTools::new(DiscoveryConfig::default())
    }

    #[test]
    fn probe_args_read_password_from_stdin() {
        let args = tools().probe_args(Ipv4Addr::new(192, 168, 1, 42));
        assert_eq!(&args[..3], ["-S", "-p", ""]);
        assert_eq!(args.last().map(String::as_str), Some("192.168.1.42"));
    }

    /// Stand-in for `sudo`: records its argv, then answers like nmap only
    /// when the first stdin line is the expected password.
    #[cfg(unix)]
    fn fake_sudo(dir: &std::path::Path, body: &str) -> SystemTools {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("sudo");
        let argv_log = dir.join("argv");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\n{}\n",
                argv_log.display(),
                body
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        SystemTools::new(DiscoveryConfig {
            sudo_path: script.display().to_string(),
            probe_timeout_secs: 1,
            ..DiscoveryConfig::default()
        })
    }

    /// A freshly written script can briefly fail to exec (ETXTBSY) while
    /// another test thread is forking.
    #[cfg(unix)]
    async fn check_host_retrying(
        tools: &SystemTools,
        address: Ipv4Addr,
        secret: &SecretString,
    ) -> FetchResult<String> {
        let mut last = tools.probe_host(address, secret).await;
        for _ in 0..3 {
            match &last {
                Err(e) if e.kind == FetchErrorKind::DiscoveryToolError => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    last = tools.probe_host(address, secret).await;
                }
                _ => break,
            }
        }
        last
    }

    #[cfg(unix)]
    const ANSWER_IF_PASSWORD: &str = "read line\n\
        if [ \"$line\" = hunter2 ]; then\n\
          echo 'MAC Address: AA:BB:CC:DD:EE:FF (Raspberry Pi Trading)'\n\
        fi";

    #[cfg(unix)]
    #[tokio::test]
    async fn secret_reaches_sudo_through_stdin_only() {
        let dir = tempfile::tempdir().unwrap();
        let tools = fake_sudo(dir.path(), ANSWER_IF_PASSWORD);
        let secret = SecretString::new("hunter2".to_string());

        let out = check_host_retrying(&tools, Ipv4Addr::new(192, 168, 1, 42), &secret)
            .await
            .unwrap();
        assert!(out.contains("MAC Address: AA:BB:CC:DD:EE:FF"));

        let argv = std::fs::read_to_string(dir.path().join("argv")).unwrap();
        assert!(!argv.contains("hunter2"));
        let argv: Vec<&str> = argv.lines().collect();
        assert_eq!(argv, ["-S", "-p", "", "nmap", "-sn", "-n", "192.168.1.42"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn wrong_secret_reports_no_device() {
        let dir = tempfile::tempdir().unwrap();
        let tools = fake_sudo(dir.path(), ANSWER_IF_PASSWORD);
        let secret = SecretString::new("letmein".to_string());

        let out = check_host_retrying(&tools, Ipv4Addr::new(192, 168, 1, 42), &secret)
            .await
            .unwrap();
        assert!(!out.contains("MAC Address"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_sudo_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let tools = fake_sudo(dir.path(), "read line\nsleep 10");
        let secret = SecretString::new("hunter2".to_string());

        let started = std::time::Instant::now();
        let err = check_host_retrying(&tools, Ipv4Addr::new(192, 168, 1, 42), &secret)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(8));
    }

    #[test]
    fn sweep_args_cover_the_subnet() {
        assert_eq!(tools().sweep_args("10.0.0.0/24"), vec!["-sn", "10.0.0.0/24"]);
    }

    #[tokio::test]
    async fn missing_binary_is_a_tool_error() {
        let cfg = DiscoveryConfig {
            nmap_path: "/nonexistent/pifetch-nmap".into(),
            arp_path: "/nonexistent/pifetch-arp".into(),
            ..DiscoveryConfig::default()
        };
        let tools = SystemTools::new(cfg);
        let err = tools.sweep_subnet("192.168.1.0/24").await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::DiscoveryToolError);
        let err = tools.neighbor_table().await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::DiscoveryToolError);
    }

    #[tokio::test]
    async fn slow_process_times_out() {
        let fut = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err::<std::process::Output, _>(std::io::Error::other("unreachable"))
        };
        let err = run_with_timeout(fut, Duration::from_millis(10), "sleep")
            .await
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Timeout);
    }
}
