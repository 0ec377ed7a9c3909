//! W3C Trace Context Propagation
//!
//! Extracts the caller's trace context from incoming request headers so the
//! handler span joins the caller's trace.
//!
//! ## Headers
//!
//! - **traceparent**: `00-{trace-id}-{span-id}-{trace-flags}`
//!   e.g. `00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`
//! - **tracestate**: optional vendor data, e.g. `congo=t61rcWkgMzE`
//!
//! A missing or malformed `traceparent` yields a context without a remote
//! parent, and the handler span starts a new trace.

use hyper::header::HeaderMap;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;

/// Read-only view of request headers for OpenTelemetry propagators.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

/// Extract the caller's trace context from `headers`.
pub fn extract_context(propagator: &TraceContextPropagator, headers: &HeaderMap) -> Context {
    propagator.extract(&HeaderExtractor(headers))
}

/// Whether `cx` carries a valid remote span to parent from.
pub fn has_remote_parent(cx: &Context) -> bool {
    let span = cx.span();
    let span_context = span.span_context();
    span_context.is_valid() && span_context.is_remote()
}
