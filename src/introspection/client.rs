use http::StatusCode;
use tracing::{debug, warn};

use crate::cache::result_cache::ResultCache;
use crate::config::options::IntrospectionConfig;
use crate::helpers::time::get_instant;
use crate::introspection::error::IntrospectionError;
use crate::introspection::result::Introspection;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::TOKEN_FIELD;

/// One introspection round trip. No cache, no retry.
///
/// The configured form fields are copied and `token` is replaced with the
/// credential, whatever the configured value was.
pub async fn introspect<C: ResultCache>(
    token: &str,
    config: &IntrospectionConfig<C>,
) -> Result<Introspection, IntrospectionError> {
    let metrics = get_metrics().await;
    let start = get_instant();

    let result = send(token, config).await;

    metrics
        .introspection_duration
        .observe(start.elapsed().as_secs_f64());
    match &result {
        Ok(introspection) => {
            let outcome = if introspection.is_active() { "active" } else { "inactive" };
            metrics.introspection_requests.with_label_values(&[outcome]).inc();
            debug!(active = introspection.is_active(), "token introspected");
        }
        Err(err) => {
            metrics.introspection_requests.with_label_values(&["error"]).inc();
            metrics.introspection_failures.with_label_values(&[err.reason()]).inc();
            warn!(reason = err.reason(), error = %err, "token introspection failed");
        }
    }
    result
}

async fn send<C: ResultCache>(
    token: &str,
    config: &IntrospectionConfig<C>,
) -> Result<Introspection, IntrospectionError> {
    let mut form: Vec<(&str, &str)> = Vec::with_capacity(config.body().len());
    for (name, values) in config.body() {
        if name == TOKEN_FIELD {
            continue;
        }
        for value in values {
            form.push((name.as_str(), value.as_str()));
        }
    }
    form.push((TOKEN_FIELD, token));

    let response = config
        .client()
        .post(config.endpoint())
        .form(&form)
        .headers(config.headers().clone())
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(IntrospectionError::AuthorityRejected { status });
    }

    let body = response.bytes().await?;
    Ok(Introspection::from_slice(&body)?)
}
