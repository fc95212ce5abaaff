//! Push agent: samples local system metrics and submits them to the hub.

use std::time::Duration;

use clap::Parser;
use fleet_metrics::{MetricsBody, MetricsSubmission, NetworkStats, ServerInfo};
use sysinfo::{Disks, Networks, System};
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Hub base URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    hub: String,

    /// Submission interval in seconds
    #[arg(long, default_value_t = 60)]
    interval: u64,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("fleet_metrics", LevelFilter::TRACE),
        ("agent", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    // A stable id survives restarts only when pinned via env; otherwise
    // each agent run registers as a fresh server.
    let server_id =
        std::env::var("AGENT_SERVER_ID").unwrap_or_else(|_| Uuid::new_v4().to_string());
    let token = std::env::var("AGENT_TOKEN").ok();

    let server_info = ServerInfo {
        server_id: server_id.clone(),
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        ip: local_ip().unwrap_or_else(|| "unknown".to_string()),
        os: format!(
            "{} {}",
            System::name().unwrap_or_else(|| "unknown".to_string()),
            System::os_version().unwrap_or_default(),
        ),
    };

    info!(
        "agent {server_id} submitting to {} every {}s",
        args.hub, args.interval
    );

    let url = format!("{}/api/v1/metrics", args.hub.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let mut sys = System::new_all();

    loop {
        let metrics = collect_metrics(&mut sys);
        trace!("collected metrics: {metrics:?}");

        let submission = MetricsSubmission {
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            server_info: server_info.clone(),
            metrics,
        };

        let mut request = client.post(&url).json(&submission);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!("submitted metrics ({})", response.status());
            }
            Ok(response) => {
                error!("hub rejected submission: {}", response.status());
            }
            Err(e) => {
                error!("failed to reach hub: {e}");
            }
        }

        tokio::time::sleep(Duration::from_secs(args.interval)).await;
    }
}

fn collect_metrics(sys: &mut System) -> MetricsBody {
    sys.refresh_all();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let memory = if sys.total_memory() > 0 {
        sys.used_memory() as f64 / sys.total_memory() as f64 * 100.0
    } else {
        0.0
    };

    let disks = Disks::new_with_refreshed_list();
    let (total, available) = disks.iter().fold((0u64, 0u64), |(t, a), disk| {
        (t + disk.total_space(), a + disk.available_space())
    });
    let disk = if total > 0 {
        (total - available) as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let networks = Networks::new_with_refreshed_list();
    let (bytes_sent, bytes_recv) = networks.iter().fold((0u64, 0u64), |(s, r), (_, data)| {
        (s + data.total_transmitted(), r + data.total_received())
    });

    MetricsBody {
        cpu: Some(sys.global_cpu_usage() as f64),
        memory: Some(memory),
        disk: Some(disk),
        network: Some(NetworkStats {
            bytes_sent,
            bytes_recv,
        }),
    }
}

/// Best-effort local address discovery: open a UDP socket towards a
/// public address (no packets are sent) and read the chosen source.
fn local_ip() -> Option<String> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}
