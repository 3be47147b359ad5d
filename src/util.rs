use std::net::{IpAddr, SocketAddr};

const COLLECTOR_ADDR: &str = "COLLECTOR_ADDR";

const COLLECTOR_PORT: &str = "COLLECTOR_PORT";

/// Apply `COLLECTOR_ADDR` / `COLLECTOR_PORT` overrides on top of the configured address.
pub fn listen_addr(configured: SocketAddr) -> SocketAddr {
    let ip = std::env::var(COLLECTOR_ADDR)
        .ok()
        .and_then(|res| res.parse::<IpAddr>().ok())
        .unwrap_or(configured.ip());
    let port = std::env::var(COLLECTOR_PORT)
        .ok()
        .and_then(|res| res.parse::<u16>().ok())
        .unwrap_or(configured.port());
    SocketAddr::new(ip, port)
}

/// Parse a percent string such as `"85.00%"` into `85.0`.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number.parse::<f64>().ok().filter(|value| value.is_finite())
}

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Render a byte count the way the agent reports capacities, e.g. `"15.50G"`.
pub fn format_gigabytes(bytes: u64) -> String {
    format!("{:.2}G", bytes as f64 / BYTES_PER_GB)
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}
