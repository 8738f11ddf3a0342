use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, TextEncoder, opts, register_int_counter};

pub static CONTACT_SUBMISSIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "inquiry_contact_submissions_total",
        "Total number of accepted contact form submissions"
    ))
    .unwrap()
});

pub static LOGIN_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "inquiry_login_failures_total",
        "Total number of rejected admin login attempts"
    ))
    .unwrap()
});

pub static LOGIN_LOCKOUTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "inquiry_login_lockouts_total",
        "Total number of rate-limited admin login attempts"
    ))
    .unwrap()
});

pub static EXPORTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "inquiry_exports_total",
        "Total number of message exports served"
    ))
    .unwrap()
});

pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}
