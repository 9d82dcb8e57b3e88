//! Demo RPC client: builds a channel, issues one `Order.makeOrder` call with a
//! deadline, and prints the decoded response or the controller's error.

use std::process::ExitCode;

use codec::Message;
use demos::order_service::{OrderRequest, OrderResponse};
use net::NetAddr;
use rpc::{Channel, Controller};

fn main() -> ExitCode {
    let addr_str = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:8080".to_string());
    let Some(addr) = NetAddr::parse(&addr_str) else {
        eprintln!("invalid server address: {addr_str}");
        return ExitCode::FAILURE;
    };

    let request = OrderRequest {
        price: 100,
        goods: "apple".to_string(),
    };

    let mut controller = Controller::new();
    controller.set_timeout_ms(5000);

    let mut channel = Channel::new(addr);
    channel.init();

    match channel.call_method(&mut controller, "Order.makeOrder", &request) {
        Ok(response_bytes) => match OrderResponse::decode(&response_bytes) {
            Ok(response) => {
                println!("makeOrder -> {response:?}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("failed to decode response: {err}");
                ExitCode::FAILURE
            }
        },
        Err(kind) => {
            eprintln!("call failed: {kind} ({})", controller.error_text());
            ExitCode::FAILURE
        }
    }
}
