//! InfluxDB 1.x HTTP write API sink.

use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use tracing::debug;

use crate::config::InfluxSettings;
use crate::model::{Batch, MetricPoint};
use crate::sink::{MetricSink, SinkError};

/// Writes batches as line protocol to `{address}/write`.
pub struct InfluxSink {
    client: Client,
    write_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl InfluxSink {
    /// Builds the HTTP client. Fails on unusable addresses.
    pub fn new(settings: &InfluxSettings) -> Result<Self, SinkError> {
        let write_url = write_url(&settings.address)?;
        let client = build_client(settings.timeout)?;
        Ok(Self {
            client,
            write_url,
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }
}

fn build_client(timeout: Duration) -> Result<Client, SinkError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("dirsized/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SinkError::Transport(e.to_string()))
}

/// Derives the write endpoint, keeping any path prefix of `address`.
fn write_url(address: &str) -> Result<Url, SinkError> {
    let mut base =
        Url::parse(address).map_err(|e| SinkError::InvalidAddress(format!("{}: {}", address, e)))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(SinkError::InvalidAddress(format!(
            "{}: unsupported scheme '{}'",
            address,
            base.scheme()
        )));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("write")
        .map_err(|e| SinkError::InvalidAddress(format!("{}: {}", address, e)))
}

impl MetricSink for InfluxSink {
    fn write_batch(&mut self, batch: &Batch) -> Result<(), SinkError> {
        if batch.is_empty() {
            debug!("No points for {}, nothing to POST", batch.database);
            return Ok(());
        }
        let body = to_line_protocol(&batch.points);

        let mut query = vec![("db", batch.database.as_str()), ("precision", "ns")];
        if let Some(rp) = &batch.retention_policy {
            query.push(("rp", rp.as_str()));
        }

        let mut request = self.client.post(self.write_url.clone()).query(&query);
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.password.as_ref());
        }

        debug!(
            "POST {} ({} points, {} bytes)",
            self.write_url,
            batch.len(),
            body.len()
        );
        let response = request
            .body(body)
            .send()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(SinkError::Status {
            code: status.as_u16(),
            body,
        })
    }
}

/// Encodes points as newline-separated line protocol.
pub fn to_line_protocol(points: &[MetricPoint]) -> String {
    let mut out = String::new();
    for point in points {
        encode_point(&mut out, point);
        out.push('\n');
    }
    out
}

fn encode_point(out: &mut String, point: &MetricPoint) {
    escape_into(out, point.measurement(), &[',', ' ']);
    for (key, value) in point.tags() {
        out.push(',');
        escape_into(out, key, &[',', '=', ' ']);
        out.push('=');
        escape_into(out, value, &[',', '=', ' ']);
    }
    out.push_str(&format!(" value={}i", point.value()));
    // Out-of-range instants are left for the server to stamp.
    if let Some(ns) = point.timestamp().timestamp_nanos_opt() {
        out.push_str(&format!(" {}", ns));
    }
}

fn escape_into(out: &mut String, s: &str, special: &[char]) {
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}
