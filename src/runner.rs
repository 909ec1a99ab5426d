use std::time::Instant;

use chrono::Utc;
use reqwest::Client;

use crate::observation::{NetworkCondition, Observation};

/// Perform one measured GET against `url`, producing an [`Observation`].
///
/// The start instant is captured immediately before dispatch. Time to first
/// byte is taken when the first body chunk becomes observable to the caller,
/// the same way for every protocol. The body is drained fully so
/// `bytes_received` reflects the complete transfer.
///
/// `protocol_hint` is the label recorded when the request fails before the
/// transport reports a negotiated version; successful responses are labeled
/// with the version the transport actually negotiated.
///
/// Never retries, and touches no shared state. Transport failures
/// (connect/TLS/timeout) come back as observations with `error` set, elapsed
/// `total_time`, and zeroed status/bytes. A mid-body read failure keeps
/// whatever bytes and first-byte time were captured before it.
pub async fn measure_request(
    client: &Client,
    url: &str,
    protocol_hint: &str,
    condition: &NetworkCondition,
) -> Observation {
    let request_time = Utc::now();
    let start = Instant::now();

    let mut resp = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(err) => {
            return Observation {
                protocol: protocol_hint.to_owned(),
                request_time,
                time_to_first_byte: None,
                total_time: start.elapsed(),
                bytes_received: 0,
                status_code: 0,
                error: Some(err.to_string()),
                condition: condition.clone(),
            };
        }
    };

    // http::Version debug-formats as "HTTP/1.1", "HTTP/2.0", "HTTP/3.0".
    let protocol = format!("{:?}", resp.version());
    let status_code = resp.status().as_u16();

    let mut time_to_first_byte = None;
    let mut bytes_received: u64 = 0;

    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                if time_to_first_byte.is_none() && !chunk.is_empty() {
                    time_to_first_byte = Some(start.elapsed());
                }
                bytes_received += chunk.len() as u64;
            }
            Ok(None) => break,
            Err(err) => {
                // Mid-body failure: keep what was captured so far.
                return Observation {
                    protocol,
                    request_time,
                    time_to_first_byte,
                    total_time: start.elapsed(),
                    bytes_received,
                    status_code,
                    error: Some(err.to_string()),
                    condition: condition.clone(),
                };
            }
        }
    }

    Observation {
        protocol,
        request_time,
        time_to_first_byte,
        total_time: start.elapsed(),
        bytes_received,
        status_code,
        error: None,
        condition: condition.clone(),
    }
}
