// Shared AWS SDK plumbing for the SSO and SSO-OIDC clients
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use aws_types::request_id::RequestId;
use aws_types::SdkConfig;

/// SSO-OIDC and SSO calls are unauthenticated, only the region matters
pub async fn sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}

/// Endpoint override for pointing the clients at a local mock server
pub fn endpoint_override(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|url| !url.is_empty())
}

pub fn format_sdk_error<E>(err: &E) -> String
where
    E: ProvideErrorMetadata + std::fmt::Display + std::fmt::Debug,
{
    let mut parts = Vec::new();
    let mut base = err.to_string();
    if base == "service error" {
        base = format!("{err:?}");
    }
    parts.push(base);
    let meta = err.meta();
    if let Some(code) = meta.code() {
        parts.push(format!("code={code}"));
    }
    if let Some(message) = meta.message() {
        parts.push(format!("message={message}"));
    }
    if let Some(request_id) = meta.request_id() {
        parts.push(format!("request_id={request_id}"));
    }
    parts.join(" | ")
}

/// SDK output structs report absent numeric fields as zero
pub fn positive<T: Default + PartialOrd>(value: T) -> Option<T> {
    (value > T::default()).then_some(value)
}
