use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::engine::presence::GeoInfo;

/// Approximate IP geolocation via ip-api.com. Lookups fail open: any
/// network or parse failure degrades to "Unknown" placeholders so the
/// triggering user action is never blocked.
pub struct Geolocator {
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct IpApiResponse {
    status: String,
    country: Option<String>,
    city: Option<String>,
    isp: Option<String>,
}

impl Geolocator {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(3))
                .build()
                .expect("failed to build geolocation http client"),
        }
    }

    pub async fn lookup(&self, ip: &str) -> GeoInfo {
        if is_private(ip) {
            return GeoInfo::local();
        }

        let url = format!("http://ip-api.com/json/{ip}");
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(%ip, error = %e, "geolocation request failed");
                return GeoInfo::unknown();
            }
        };

        match response.json::<IpApiResponse>().await {
            Ok(data) if data.status == "success" => GeoInfo {
                country: data.country.unwrap_or_else(|| "Unknown".into()),
                city: data.city.unwrap_or_else(|| "Unknown".into()),
                isp: data.isp.unwrap_or_else(|| "Unknown".into()),
            },
            _ => GeoInfo::unknown(),
        }
    }
}

impl Default for Geolocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Private/loopback ranges never leave the process.
fn is_private(ip: &str) -> bool {
    ip.starts_with("127.")
        || ip.starts_with("192.168.")
        || ip.starts_with("10.")
        || ip == "::1"
        || ip == "localhost"
        || ip == "unknown"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_ranges() {
        assert!(is_private("127.0.0.1"));
        assert!(is_private("192.168.1.20"));
        assert!(is_private("10.4.5.6"));
        assert!(is_private("::1"));
        assert!(is_private("unknown"));
        assert!(!is_private("203.0.113.9"));
    }

    #[tokio::test]
    async fn test_private_ip_short_circuits() {
        let geo = Geolocator::new();
        assert_eq!(geo.lookup("127.0.0.1").await, GeoInfo::local());
        assert_eq!(geo.lookup("192.168.0.2").await, GeoInfo::local());
    }
}
