//! Service registry and request dispatch.
//!
//! Rust has no runtime reflection for "construct a zero-valued request/response of the
//! declared type", so a [`Service`] implementation owns its own payload decode/encode
//! rather than the dispatcher doing it generically; the dispatcher's job is purely
//! routing, error-path bookkeeping, and publishing the per-call [`Controller`] and
//! [`crate::runtime`] context before the handler runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use codec::Frame;
use net::NetAddr;

use crate::controller::Controller;
use crate::error::ErrorKind;
use crate::runtime;

/// A registered handler for one service's methods.
pub trait Service: Send + Sync {
    /// The service's fully qualified name, e.g. `"Order"`.
    fn name(&self) -> &str;

    /// Whether this service declares `method`.
    fn has_method(&self, method: &str) -> bool;

    /// Invokes `method` with the raw request payload, returning the raw response
    /// payload. Errors are mapped to [`ErrorKind::FailedDeserialize`] or
    /// [`ErrorKind::FailedSerialize`] by the implementation as appropriate.
    fn call(&self, method: &str, controller: &mut Controller, request: Vec<u8>) -> Result<Vec<u8>, ErrorKind>;
}

/// Routes decoded request frames to registered [`Service`] handlers.
#[derive(Default)]
pub struct Dispatcher {
    services: RwLock<HashMap<String, Arc<dyn Service>>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.services.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("Dispatcher").field("services", &count).finish()
    }
}

impl Dispatcher {
    /// An empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service`. Registering a name that is already present leaves the
    /// existing mapping in place; the first registration wins.
    pub fn register(&self, service: Arc<dyn Service>) {
        let mut services = self.services.write().unwrap();
        services.entry(service.name().to_string()).or_insert(service);
    }

    /// Decodes `request.method_name` as `Service.Method`, resolves the service and
    /// method, invokes the handler, and returns a fully populated response frame.
    /// Every error path still carries the request's msg-id and method-name so the
    /// caller can correlate the reply.
    pub fn dispatch(&self, request: Frame, peer_addr: NetAddr) -> Frame {
        let msg_id = request.msg_id.clone();
        let method_name = request.method_name.clone();

        let Some((service_name, method)) = parse_service_and_method(&method_name) else {
            return Frame::error(msg_id, method_name, ErrorKind::ParseServiceName.code(), "invalid method name: missing '.'");
        };

        let service = {
            let services = self.services.read().unwrap();
            services.get(service_name).cloned()
        };
        let Some(service) = service else {
            return Frame::error(
                msg_id,
                method_name,
                ErrorKind::ServiceNotFound.code(),
                format!("no such service: {service_name}"),
            );
        };

        if !service.has_method(method) {
            return Frame::error(
                msg_id,
                method_name,
                ErrorKind::MethodNotFound.code(),
                format!("no such method: {method}"),
            );
        }

        let mut controller = Controller::new();
        controller.set_msg_id(&msg_id);
        controller.set_peer_addr(peer_addr);

        runtime::set_current(&msg_id, &method_name);
        let result = service.call(method, &mut controller, request.payload);
        runtime::clear_current();

        match result {
            Ok(payload) => Frame::response(msg_id, method_name, payload),
            Err(kind) => Frame::error(msg_id, method_name, kind.code(), kind.to_string()),
        }
    }
}

/// Splits `"Service.Method"` at the first `.`; both halves must be non-empty.
fn parse_service_and_method(full_name: &str) -> Option<(&str, &str)> {
    let dot = full_name.find('.')?;
    let (service, rest) = full_name.split_at(dot);
    let method = &rest[1..];
    if service.is_empty() || method.is_empty() {
        return None;
    }
    Some((service, method))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoService;

    impl Service for EchoService {
        fn name(&self) -> &str {
            "Echo"
        }

        fn has_method(&self, method: &str) -> bool {
            method == "ping"
        }

        fn call(&self, _method: &str, _controller: &mut Controller, request: Vec<u8>) -> Result<Vec<u8>, ErrorKind> {
            Ok(request)
        }
    }

    #[test]
    fn parses_service_and_method() {
        assert_eq!(parse_service_and_method("Order.makeOrder"), Some(("Order", "makeOrder")));
        assert_eq!(parse_service_and_method("noDot"), None);
        assert_eq!(parse_service_and_method(".method"), None);
        assert_eq!(parse_service_and_method("Service."), None);
    }

    #[test]
    fn dispatch_routes_to_registered_service() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(EchoService));

        let request = Frame::response("1", "Echo.ping", b"hello".to_vec());
        let response = dispatcher.dispatch(request, NetAddr::invalid());

        assert_eq!(response.error_code, 0);
        assert_eq!(response.payload, b"hello");
        assert_eq!(response.msg_id, "1");
    }

    #[test]
    fn unknown_service_reports_service_not_found() {
        let dispatcher = Dispatcher::new();
        let request = Frame::response("2", "Missing.method", vec![]);
        let response = dispatcher.dispatch(request, NetAddr::invalid());
        assert_eq!(response.error_code, ErrorKind::ServiceNotFound.code());
        assert_eq!(response.msg_id, "2");
    }

    #[test]
    fn unknown_method_reports_method_not_found() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(EchoService));
        let request = Frame::response("3", "Echo.missing", vec![]);
        let response = dispatcher.dispatch(request, NetAddr::invalid());
        assert_eq!(response.error_code, ErrorKind::MethodNotFound.code());
    }

    #[test]
    fn malformed_method_name_reports_parse_error() {
        let dispatcher = Dispatcher::new();
        let request = Frame::response("4", "nodot", vec![]);
        let response = dispatcher.dispatch(request, NetAddr::invalid());
        assert_eq!(response.error_code, ErrorKind::ParseServiceName.code());
    }

    #[test]
    fn registering_same_service_twice_keeps_first() {
        struct Tagged(&'static str);
        impl Service for Tagged {
            fn name(&self) -> &str {
                "Tagged"
            }
            fn has_method(&self, _m: &str) -> bool {
                true
            }
            fn call(&self, _m: &str, _c: &mut Controller, _r: Vec<u8>) -> Result<Vec<u8>, ErrorKind> {
                Ok(self.0.as_bytes().to_vec())
            }
        }

        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(Tagged("first")));
        dispatcher.register(Arc::new(Tagged("second")));

        let response = dispatcher.dispatch(Frame::response("5", "Tagged.any", vec![]), NetAddr::invalid());
        assert_eq!(response.payload, b"first");
    }
}
