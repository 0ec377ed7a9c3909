//! Request handling for the dice endpoint
//!
//! [`RollDiceHandler`] draws one roll per request, records it in a span and a
//! log record, and returns the bare number as the body. [`Router`] maps the
//! single registered path to the handler and answers everything else with a
//! plain 404.

use crate::dice::Dice;
use crate::tracing::propagation::extract_context;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use opentelemetry::trace::{Span as _, SpanKind, Tracer as _};
use opentelemetry::KeyValue;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::Tracer;
use std::sync::Arc;
use tracing::info;

/// Path the dice handler is registered on
pub const ROLL_DICE_PATH: &str = "/rolldice";

/// Name of the span recorded for every roll
pub const ROLL_DICE_SPAN: &str = "GET /rolldice";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Handler for `/rolldice`
#[derive(Debug)]
pub struct RollDiceHandler {
    dice: Arc<Dice>,
    tracer: Tracer,
    propagator: TraceContextPropagator,
}

impl RollDiceHandler {
    /// Create a handler drawing from `dice` and recording spans on `tracer`.
    pub fn new(dice: Arc<Dice>, tracer: Tracer) -> Self {
        Self {
            dice,
            tracer,
            propagator: TraceContextPropagator::new(),
        }
    }

    /// Roll the die for one request.
    ///
    /// The span is a child of any trace context carried in the request
    /// headers. Query string and body are ignored.
    pub fn handle<B>(&self, req: &Request<B>) -> Response<String> {
        let parent_cx = extract_context(&self.propagator, req.headers());

        // The SDK span ends itself on drop, so it is closed on every exit
        // path including unwinding.
        let mut span = self
            .tracer
            .span_builder(ROLL_DICE_SPAN)
            .with_kind(SpanKind::Server)
            .with_attributes(vec![
                KeyValue::new("http.method", req.method().to_string()),
                KeyValue::new("http.target", req.uri().path().to_string()),
            ])
            .start_with_context(&self.tracer, &parent_cx);

        let n = self.dice.roll();
        span.set_attribute(KeyValue::new("dice.value", i64::from(n)));

        info!(
            dice = n,
            trace_id = %span.span_context().trace_id(),
            "rolldice called"
        );

        let response = text_response(StatusCode::OK, n.to_string());
        span.end();
        response
    }
}

/// Path router. Cheap to clone; clones share the handler.
#[derive(Debug, Clone)]
pub struct Router {
    rolldice: Arc<RollDiceHandler>,
}

impl Router {
    /// Register `handler` on [`ROLL_DICE_PATH`].
    pub fn new(handler: RollDiceHandler) -> Self {
        Self {
            rolldice: Arc::new(handler),
        }
    }

    /// Dispatch on the request path. Any method is accepted on the dice path.
    pub fn route<B>(&self, req: &Request<B>) -> Response<String> {
        match req.uri().path() {
            ROLL_DICE_PATH => self.rolldice.handle(req),
            _ => not_found(),
        }
    }
}

fn text_response(status: StatusCode, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

fn not_found() -> Response<String> {
    text_response(StatusCode::NOT_FOUND, NOT_FOUND_BODY.to_string())
}
