use std::net::Ipv4Addr;

use futures_util::stream::{self, StreamExt};
use if_addrs::IfAddr;
use tokio::net::UdpSocket;

use crate::config::ControllerConfig;
use crate::error::{Result, RgbwwError};
use crate::protocol::Endpoint;
use crate::sender::{build_client, CommandSender};
use crate::types::DiscoveredController;

/// Narrowest accepted scan prefix is /13 (about half a million hosts)
const MIN_SCAN_PREFIX: u8 = 13;

/// Host addresses of the network `addr/prefix`.
///
/// Network and broadcast addresses are excluded, except for /31 and /32
/// which have none.
pub fn subnet_hosts(addr: Ipv4Addr, prefix: u8) -> Result<Vec<Ipv4Addr>> {
    if !(MIN_SCAN_PREFIX..=32).contains(&prefix) {
        return Err(RgbwwError::InvalidScanRange { prefix });
    }

    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    let network = u32::from(addr) & mask;
    let broadcast = network | !mask;

    let hosts = match prefix {
        32 => vec![Ipv4Addr::from(network)],
        31 => vec![Ipv4Addr::from(network), Ipv4Addr::from(broadcast)],
        _ => (network + 1..broadcast).map(Ipv4Addr::from).collect(),
    };
    Ok(hosts)
}

/// Network of the interface carrying the default route, as `(network, prefix)`.
///
/// The route is found by connecting a UDP socket towards a public
/// address (nothing is sent). Without a route, the first non-loopback,
/// non-link-local IPv4 interface is used.
pub async fn local_scan_range() -> Result<(Ipv4Addr, u8)> {
    let route_ip = default_route_ip().await;
    let interfaces: Vec<(Ipv4Addr, Ipv4Addr)> = if_addrs::get_if_addrs()?
        .into_iter()
        .filter_map(|iface| match iface.addr {
            IfAddr::V4(v4) => Some((v4.ip, v4.netmask)),
            IfAddr::V6(_) => None,
        })
        .collect();

    let (network, prefix) = pick_scan_range(&interfaces, route_ip).ok_or(RgbwwError::NoScanRange)?;
    tracing::info!("Local scan range {}/{}", network, prefix);
    Ok((network, prefix))
}

async fn default_route_ip() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).await.ok()?;
    match socket.local_addr().ok()?.ip() {
        std::net::IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

/// Choose the `(ip, netmask)` entry matching the route address, or the first
/// usable one
fn pick_scan_range(
    interfaces: &[(Ipv4Addr, Ipv4Addr)],
    route_ip: Option<Ipv4Addr>,
) -> Option<(Ipv4Addr, u8)> {
    let usable = |ip: &Ipv4Addr| !ip.is_loopback() && !ip.is_link_local();
    let (ip, netmask) = route_ip
        .and_then(|route| interfaces.iter().find(|(ip, _)| *ip == route))
        .or_else(|| interfaces.iter().find(|(ip, _)| usable(ip)))?;

    let prefix = netmask_to_prefix(*netmask)?;
    let network = u32::from(*ip) & u32::from(*netmask);
    Some((Ipv4Addr::from(network), prefix))
}

/// Prefix length of a contiguous netmask (`255.255.255.0` is 24)
fn netmask_to_prefix(netmask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(netmask);
    let ones = bits.leading_ones();
    (ones + bits.trailing_zeros() == 32).then_some(ones as u8)
}

/// Probe every host for a controller.
///
/// Up to `config.scan_concurrency` hosts are checked at a time, each bounded
/// by the HTTP timeout. Hosts that do not answer `/info` with a MAC address
/// are left out.
pub async fn scan(
    hosts: impl IntoIterator<Item = Ipv4Addr>,
    config: &ControllerConfig,
) -> Result<Vec<DiscoveredController>> {
    let http = build_client(config.http_timeout)
        .map_err(|e| RgbwwError::unavailable("scan", e))?;
    let port = config.http_port;

    let found: Vec<DiscoveredController> = stream::iter(hosts)
        .map(|ip| {
            let sender = CommandSender::with_client(ip.to_string(), port, http.clone());
            async move { probe(ip, &sender).await }
        })
        .buffer_unordered(config.scan_concurrency.max(1))
        .filter_map(|found| async move { found })
        .collect()
        .await;

    tracing::info!("Scan found {} controller(s)", found.len());
    Ok(found)
}

async fn probe(ip: Ipv4Addr, sender: &CommandSender) -> Option<DiscoveredController> {
    let info = match sender.get(Endpoint::Info).await {
        Ok(info) => info,
        Err(e) => {
            tracing::trace!("No controller at {}: {}", ip, e);
            return None;
        }
    };

    let Some(mac) = info["connection"]["mac"].as_str().map(String::from) else {
        tracing::debug!("{} answered /info without a MAC address", ip);
        return None;
    };

    tracing::info!("Found controller at {} with MAC {}", ip, mac);
    Some(DiscoveredController { ip, mac, info })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnet_hosts_24() {
        let hosts = subnet_hosts(Ipv4Addr::new(192, 168, 2, 77), 24).unwrap();
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], Ipv4Addr::new(192, 168, 2, 1));
        assert_eq!(hosts[253], Ipv4Addr::new(192, 168, 2, 254));
    }

    #[test]
    fn test_subnet_hosts_small() {
        let ip = Ipv4Addr::new(10, 0, 0, 9);
        assert_eq!(subnet_hosts(ip, 32).unwrap(), vec![ip]);
        assert_eq!(
            subnet_hosts(ip, 31).unwrap(),
            vec![Ipv4Addr::new(10, 0, 0, 8), Ipv4Addr::new(10, 0, 0, 9)]
        );
        assert_eq!(
            subnet_hosts(ip, 30).unwrap(),
            vec![Ipv4Addr::new(10, 0, 0, 9), Ipv4Addr::new(10, 0, 0, 10)]
        );
    }

    #[test]
    fn test_netmask_to_prefix() {
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 255, 255, 0)), Some(24));
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 255, 240, 0)), Some(20));
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 255, 255, 255)), Some(32));
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(0, 0, 0, 0)), Some(0));
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 0, 255, 0)), None);
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(0, 255, 255, 255)), None);
    }

    #[test]
    fn test_pick_scan_range() {
        let interfaces = [
            (Ipv4Addr::LOCALHOST, Ipv4Addr::new(255, 0, 0, 0)),
            (Ipv4Addr::new(169, 254, 3, 4), Ipv4Addr::new(255, 255, 0, 0)),
            (Ipv4Addr::new(192, 168, 1, 23), Ipv4Addr::new(255, 255, 255, 0)),
            (Ipv4Addr::new(10, 20, 30, 40), Ipv4Addr::new(255, 255, 240, 0)),
        ];

        assert_eq!(
            pick_scan_range(&interfaces, Some(Ipv4Addr::new(10, 20, 30, 40))),
            Some((Ipv4Addr::new(10, 20, 16, 0), 20))
        );
        assert_eq!(
            pick_scan_range(&interfaces, None),
            Some((Ipv4Addr::new(192, 168, 1, 0), 24))
        );
        // Route through an interface we were not told about
        assert_eq!(
            pick_scan_range(&interfaces, Some(Ipv4Addr::new(172, 16, 0, 1))),
            Some((Ipv4Addr::new(192, 168, 1, 0), 24))
        );
        assert_eq!(pick_scan_range(&interfaces[..2], None), None);
    }

    #[test]
    fn test_too_broad() {
        let ip = Ipv4Addr::new(10, 0, 0, 1);
        assert!(matches!(
            subnet_hosts(ip, 12),
            Err(RgbwwError::InvalidScanRange { prefix: 12 })
        ));
        assert!(subnet_hosts(ip, 33).is_err());
        assert_eq!(subnet_hosts(ip, 13).unwrap().len(), (1 << 19) - 2);
    }
}
