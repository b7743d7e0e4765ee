//! Raw TCP (port 9100) reachability and subnet sweep

use crate::device::PrinterDescriptor;
use crate::error::{PrintError, PrintResult};
use futures::future::join_all;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, info, instrument};

/// Subnet used when the outbound interface cannot be determined
pub const FALLBACK_SUBNET: &str = "192.168.1";

/// Upper bound on hosts probed by one sweep
pub const MAX_SCAN_HOSTS: usize = 254;

/// Bounded TCP connect probe
///
/// Timeout and connection errors both resolve to `false`.
pub async fn check_network_printer(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "probe refused");
            false
        }
        Err(_) => {
            debug!(host, port, "probe timed out");
            false
        }
    }
}

/// Probe `subnet.start ..= subnet.end` fully in parallel
///
/// Only reachable hosts are returned. Without a subnet the /24 of the
/// outbound interface is used.
#[instrument(skip(timeout))]
pub async fn scan_network_printers(
    subnet: Option<&str>,
    start: u8,
    end: u8,
    port: u16,
    timeout: Duration,
) -> PrintResult<Vec<PrinterDescriptor>> {
    let subnet = match subnet {
        Some(s) => validate_subnet(s)?,
        None => local_subnet().await,
    };
    if start == 0 || start > end || end == 255 {
        return Err(PrintError::InvalidConfig(format!(
            "Invalid scan range {}..={}",
            start, end
        )));
    }
    let count = (end - start) as usize + 1;
    if count > MAX_SCAN_HOSTS {
        return Err(PrintError::InvalidConfig(format!(
            "Scan range of {} hosts exceeds {}",
            count, MAX_SCAN_HOSTS
        )));
    }

    let probes = (start..=end).map(|last| {
        let host = format!("{}.{}", subnet, last);
        async move {
            let online = check_network_printer(&host, port, timeout).await;
            online.then_some(host)
        }
    });

    let found: Vec<PrinterDescriptor> = join_all(probes)
        .await
        .into_iter()
        .flatten()
        .map(|host| PrinterDescriptor::network(&host, port, ""))
        .collect();

    info!(subnet = %subnet, count = found.len(), "network scan complete");
    Ok(found)
}

/// First three octets of the outbound IPv4 address
///
/// Connecting a UDP socket sends nothing; it only asks the OS which local
/// address would be used.
pub async fn local_subnet() -> String {
    match outbound_ipv4().await {
        Some(ip) => {
            let [a, b, c, _] = ip.octets();
            format!("{}.{}.{}", a, b, c)
        }
        None => FALLBACK_SUBNET.to_string(),
    }
}

async fn outbound_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    socket.connect("8.8.8.8:80").await.ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() => Some(*addr.ip()),
        _ => None,
    }
}

fn validate_subnet(subnet: &str) -> PrintResult<String> {
    let trimmed = subnet.trim().trim_end_matches('.');
    let octets: Vec<&str> = trimmed.split('.').collect();
    if octets.len() != 3 || octets.iter().any(|o| o.parse::<u8>().is_err()) {
        return Err(PrintError::InvalidConfig(format!(
            "Subnet must be three octets like 192.168.1, got {:?}",
            subnet
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(check_network_printer("127.0.0.1", port, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_probe_closed_port_is_false() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let started = std::time::Instant::now();
        assert!(!check_network_printer("127.0.0.1", port, Duration::from_millis(500)).await);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_scan_loopback_range() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let found = scan_network_printers(Some("127.0.0"), 1, 1, port, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, format!("network-127.0.0.1:{}", port));
        assert_eq!(found[0].name, "Network printer 127.0.0.1");
    }

    #[tokio::test]
    async fn test_scan_rejects_bad_input() {
        let t = Duration::from_millis(10);
        assert!(scan_network_printers(Some("10.0"), 1, 2, 9100, t).await.is_err());
        assert!(scan_network_printers(Some("10.0.300"), 1, 2, 9100, t).await.is_err());
        assert!(scan_network_printers(Some("10.0.0"), 9, 2, 9100, t).await.is_err());
        assert!(scan_network_printers(Some("10.0.0"), 0, 2, 9100, t).await.is_err());
    }

    #[test]
    fn test_validate_subnet_trims_dot() {
        assert_eq!(validate_subnet("10.1.2.").unwrap(), "10.1.2");
    }

    #[tokio::test]
    async fn test_local_subnet_shape() {
        let subnet = local_subnet().await;
        assert_eq!(subnet.split('.').count(), 3);
    }
}
