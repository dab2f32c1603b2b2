// ── Concurrent network scan ──
//
// Fans probes out over a candidate set with a bounded number in flight.
// Every probe carries its own deadline, so the scan finishes within
// roughly ceil(N / concurrency) probe timeouts.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use futures_util::stream;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use smartcb_api::{DeviceClient, ProbeOutcome, TransportConfig};

use super::candidates::CandidateSet;
use crate::config::ScanOptions;
use crate::error::CoreError;
use crate::model::DeviceEndpoint;

/// A breaker that answered a probe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DiscoveredDevice {
    pub endpoint: DeviceEndpoint,
    pub model: String,
}

/// Outcome of one scan. Fresh per invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    /// Devices found, ordered by endpoint.
    pub devices: Vec<DiscoveredDevice>,
    /// How many candidates were probed.
    pub probed: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl ScanResult {
    pub fn endpoints(&self) -> BTreeSet<DeviceEndpoint> {
        self.devices.iter().map(|d| d.endpoint).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Probe every candidate and collect the ones that answer as SmartCB.
///
/// Waits for all probes; more than one breaker may be present. Only
/// fails if the HTTP client itself cannot be constructed.
pub async fn scan(
    candidates: &CandidateSet,
    options: &ScanOptions,
) -> Result<ScanResult, CoreError> {
    let started = Instant::now();
    let concurrency = options.effective_concurrency();
    let deadline = options.probe_timeout;

    // One pooled client for the whole sweep; each probe gets its own
    // base URL and deadline.
    let http = TransportConfig::probe(deadline)
        .build_client()
        .map_err(CoreError::from)?;

    debug!(
        candidates = candidates.len(),
        concurrency,
        timeout_ms = deadline.as_millis(),
        "starting scan"
    );

    let mut devices: Vec<DiscoveredDevice> = stream::iter(candidates.iter().copied())
        .map(|endpoint| {
            let http = http.clone();
            async move {
                let outcome = probe_with(http, endpoint, deadline).await;
                (endpoint, outcome)
            }
        })
        .buffer_unordered(concurrency)
        .filter_map(|(endpoint, outcome)| async move {
            match outcome {
                ProbeOutcome {
                    present: true,
                    model: Some(model),
                } => Some(DiscoveredDevice { endpoint, model }),
                _ => None,
            }
        })
        .collect()
        .await;
    devices.sort();

    let result = ScanResult {
        devices,
        probed: candidates.len(),
        elapsed: started.elapsed(),
    };
    info!(
        found = result.devices.len(),
        probed = result.probed,
        elapsed_ms = result.elapsed.as_millis(),
        "scan complete"
    );
    Ok(result)
}

/// Probe a single endpoint with its own client.
pub async fn probe(endpoint: DeviceEndpoint, deadline: Duration) -> ProbeOutcome {
    match TransportConfig::probe(deadline).build_client() {
        Ok(http) => probe_with(http, endpoint, deadline).await,
        Err(e) => {
            debug!(error = %e, "could not build probe client");
            ProbeOutcome::absent()
        }
    }
}

async fn probe_with(
    http: reqwest::Client,
    endpoint: DeviceEndpoint,
    deadline: Duration,
) -> ProbeOutcome {
    match Url::parse(&endpoint.base_url()) {
        Ok(base_url) => DeviceClient::with_client(http, base_url).probe(deadline).await,
        Err(_) => ProbeOutcome::absent(),
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}
