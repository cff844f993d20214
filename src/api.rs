//! Inventory over the controller's HTTP API.
//!
//! Request construction and login live in whatever implements
//! [`ApInventoryApi`]; this module only consumes the listing and the per-AP
//! detail.

use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::ControllerConfig;
use crate::error::WlcError;
use crate::model::AccessPoint;

/// One row of the AP listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApSummary {
    pub name: String,
    pub mac_address: String,
}

/// Per-AP detail as the API returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApDetail {
    pub name: String,
    pub mac_address: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub serial: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl From<ApDetail> for AccessPoint {
    fn from(detail: ApDetail) -> Self {
        AccessPoint {
            name: detail.name,
            mac_address: detail.mac_address,
            model: detail.model,
            serial: detail.serial,
            group: detail.group,
        }
    }
}

/// The two HTTP queries the inventory path needs.
pub trait ApInventoryApi: Send + Sync + 'static {
    fn list_aps(&self) -> impl Future<Output = Result<Vec<ApSummary>, WlcError>> + Send;

    fn ap_detail(&self, mac: &str) -> impl Future<Output = Result<ApDetail, WlcError>> + Send;
}

/// Looks one AP up by MAC address.
pub async fn get_ap<A: ApInventoryApi>(api: &A, mac: &str) -> Result<AccessPoint, WlcError> {
    api.ap_detail(mac).await.map(AccessPoint::from)
}

/// Fetches the detail of every listed AP with at most
/// `config.api_concurrency` requests in flight. Results follow listing order;
/// an AP whose detail request fails keeps the listing's name and MAC.
pub async fn harvest_via_api<A: ApInventoryApi>(
    api: Arc<A>,
    config: &ControllerConfig,
) -> Result<Vec<AccessPoint>, WlcError> {
    config.validate()?;
    let listing = api.list_aps().await?;
    debug!(
        "api listed {} access points, {} requests at a time",
        listing.len(),
        config.api_concurrency
    );

    let semaphore = Arc::new(Semaphore::new(config.api_concurrency));
    let handles: Vec<(ApSummary, JoinHandle<Result<ApDetail, WlcError>>)> = listing
        .into_iter()
        .map(|summary| {
            let api = Arc::clone(&api);
            let semaphore = Arc::clone(&semaphore);
            let mac = summary.mac_address.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| WlcError::Internal("api semaphore closed".to_string()))?;
                api.ap_detail(&mac).await
            });
            (summary, handle)
        })
        .collect();

    let mut access_points = Vec::with_capacity(handles.len());
    for (summary, handle) in handles {
        let detail = match handle.await {
            Ok(Ok(detail)) => Some(detail),
            Ok(Err(e)) => {
                warn!("api detail for {} failed: {e}", summary.mac_address);
                None
            }
            Err(e) => {
                warn!("api detail task for {} failed: {e}", summary.mac_address);
                None
            }
        };
        access_points.push(match detail {
            Some(detail) => detail.into(),
            None => AccessPoint {
                name: summary.name,
                mac_address: summary.mac_address,
                ..AccessPoint::default()
            },
        });
    }
    Ok(access_points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeApi {
        details: HashMap<String, ApDetail>,
        listing: Vec<ApSummary>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeApi {
        fn new(aps: &[(&str, &str, bool)]) -> Self {
            let listing = aps
                .iter()
                .map(|(name, mac, _)| ApSummary {
                    name: name.to_string(),
                    mac_address: mac.to_string(),
                })
                .collect();
            let details = aps
                .iter()
                .filter(|(_, _, has_detail)| *has_detail)
                .map(|(name, mac, _)| {
                    (
                        mac.to_string(),
                        ApDetail {
                            name: name.to_string(),
                            mac_address: mac.to_string(),
                            model: "AIR-AP1852I-B-K9".to_string(),
                            serial: format!("SN-{name}"),
                            group: "default-group".to_string(),
                            ..ApDetail::default()
                        },
                    )
                })
                .collect();
            Self {
                details,
                listing,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl ApInventoryApi for FakeApi {
        async fn list_aps(&self) -> Result<Vec<ApSummary>, WlcError> {
            Ok(self.listing.clone())
        }

        async fn ap_detail(&self, mac: &str) -> Result<ApDetail, WlcError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.details
                .get(mac)
                .cloned()
                .ok_or_else(|| WlcError::Api(format!("404 for {mac}")))
        }
    }

    fn config_with_concurrency(api_concurrency: usize) -> ControllerConfig {
        let mut config = ControllerConfig::new("10.0.0.5", "admin", "secret");
        config.api_concurrency = api_concurrency;
        config
    }

    fn many_aps(count: usize) -> (Vec<(String, String)>, Arc<FakeApi>) {
        let names: Vec<(String, String)> = (0..count)
            .map(|i| (format!("ap{i}"), format!("00:00:00:00:00:{i:02x}")))
            .collect();
        let rows: Vec<(&str, &str, bool)> = names
            .iter()
            .map(|(n, m)| (n.as_str(), m.as_str(), true))
            .collect();
        let api = Arc::new(FakeApi::new(&rows));
        (names, api)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn harvest_keeps_listing_order_and_bounds_concurrency() {
        let (names, api) = many_aps(10);

        let aps = harvest_via_api(api.clone(), &config_with_concurrency(3))
            .await
            .expect("harvest");

        let got: Vec<&str> = aps.iter().map(|ap| ap.name.as_str()).collect();
        let want: Vec<&str> = names.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(got, want);
        assert!(api.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn configured_concurrency_is_the_bound() {
        let (_, serial_api) = many_aps(12);
        harvest_via_api(serial_api.clone(), &config_with_concurrency(1))
            .await
            .expect("harvest");
        assert_eq!(serial_api.peak.load(Ordering::SeqCst), 1);

        let (_, default_api) = many_aps(12);
        let config = ControllerConfig::new("10.0.0.5", "admin", "secret");
        harvest_via_api(default_api.clone(), &config)
            .await
            .expect("harvest");
        assert!(default_api.peak.load(Ordering::SeqCst) <= config.api_concurrency);
    }

    #[tokio::test]
    async fn zero_concurrency_is_rejected() {
        let (_, api) = many_aps(2);

        let result = harvest_via_api(api.clone(), &config_with_concurrency(0)).await;

        assert!(matches!(result, Err(WlcError::InvalidConfig(_))));
        assert_eq!(api.peak.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_detail_keeps_listing_identity() {
        let api = Arc::new(FakeApi::new(&[
            ("ap-a", "aa:aa:aa:aa:aa:aa", true),
            ("ap-b", "bb:bb:bb:bb:bb:bb", false),
        ]));

        let aps = harvest_via_api(api, &config_with_concurrency(4))
            .await
            .expect("harvest");

        assert_eq!(aps[0].serial, "SN-ap-a");
        assert_eq!(
            aps[1],
            AccessPoint {
                name: "ap-b".to_string(),
                mac_address: "bb:bb:bb:bb:bb:bb".to_string(),
                ..AccessPoint::default()
            }
        );
    }

    #[tokio::test]
    async fn get_ap_converts_detail() {
        let api = FakeApi::new(&[("ap-a", "aa:aa:aa:aa:aa:aa", true)]);

        let ap = get_ap(&api, "aa:aa:aa:aa:aa:aa").await.expect("ap");
        assert_eq!(ap.group, "default-group");
        assert!(matches!(
            get_ap(&api, "ff:ff:ff:ff:ff:ff").await,
            Err(WlcError::Api(_))
        ));
    }
}
