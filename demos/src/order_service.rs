//! Demo `Order` service: a single `makeOrder` method, serialized with `serde` +
//! `bincode` as a concrete instance of `codec::Message`.

use codec::{CodecError, Message};
use rpc::dispatcher::Service;
use rpc::{Controller, ErrorKind};
use serde::{Deserialize, Serialize};

/// Below this price, `makeOrder` rejects the order at the application level (the RPC
/// call itself still succeeds — see scenario 2).
const MIN_ORDER_PRICE: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub price: i64,
    pub goods: String,
}

impl Message for OrderRequest {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|err| CodecError::Serialize(err.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(|err| CodecError::Deserialize(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub ret_code: i32,
    pub res_info: String,
    pub order_id: String,
}

impl Message for OrderResponse {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|err| CodecError::Serialize(err.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(|err| CodecError::Deserialize(err.to_string()))
    }
}

/// The demo `Order` service, registered under the name `"Order"`.
pub struct OrderService;

impl Service for OrderService {
    fn name(&self) -> &str {
        "Order"
    }

    fn has_method(&self, method: &str) -> bool {
        method == "makeOrder" || method == "slowOrder"
    }

    fn call(&self, method: &str, _controller: &mut Controller, request: Vec<u8>) -> Result<Vec<u8>, ErrorKind> {
        match method {
            "makeOrder" => {
                let request = OrderRequest::decode(&request).map_err(|_| ErrorKind::FailedDeserialize)?;
                logging::app_info!(price = request.price, goods = %request.goods, "received makeOrder");

                let response = if request.price < MIN_ORDER_PRICE {
                    OrderResponse {
                        ret_code: -1,
                        res_info: "short of money".to_string(),
                        order_id: String::new(),
                    }
                } else {
                    OrderResponse {
                        ret_code: 0,
                        res_info: "success".to_string(),
                        order_id: "20240101".to_string(),
                    }
                };

                response.encode().map_err(|_| ErrorKind::FailedSerialize)
            }
            // Exists only to give integration tests a handler slow enough to exercise a
            // client deadline; no production call site names it.
            "slowOrder" => {
                std::thread::sleep(std::time::Duration::from_millis(SLOW_ORDER_DELAY_MS));
                OrderResponse {
                    ret_code: 0,
                    res_info: "success".to_string(),
                    order_id: "20240101".to_string(),
                }
                .encode()
                .map_err(|_| ErrorKind::FailedSerialize)
            }
            _ => Err(ErrorKind::MethodNotFound),
        }
    }
}

/// How long `slowOrder` sleeps before replying, chosen to comfortably exceed any
/// deadline a test sets while still finishing well within the test's own timeout.
const SLOW_ORDER_DELAY_MS: u64 = 5000;

#[cfg(test)]
mod tests {
    use super::*;
    use rpc::Controller;

    #[test]
    fn make_order_above_threshold_succeeds() {
        let service = OrderService;
        let mut controller = Controller::new();
        let request = OrderRequest { price: 100, goods: "apple".to_string() }.encode().unwrap();

        let response = OrderResponse::decode(&service.call("makeOrder", &mut controller, request).unwrap()).unwrap();

        assert_eq!(
            response,
            OrderResponse {
                ret_code: 0,
                res_info: "success".to_string(),
                order_id: "20240101".to_string(),
            }
        );
    }

    #[test]
    fn make_order_below_threshold_is_rejected_at_application_level() {
        let service = OrderService;
        let mut controller = Controller::new();
        let request = OrderRequest { price: 5, goods: "apple".to_string() }.encode().unwrap();

        let response = OrderResponse::decode(&service.call("makeOrder", &mut controller, request).unwrap()).unwrap();

        assert_eq!(response.ret_code, -1);
        assert_eq!(response.res_info, "short of money");
    }

    #[test]
    fn unknown_method_is_rejected() {
        let service = OrderService;
        let mut controller = Controller::new();
        assert_eq!(service.call("cancelOrder", &mut controller, vec![]).unwrap_err(), ErrorKind::MethodNotFound);
    }
}
