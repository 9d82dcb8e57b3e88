//! End-to-end scenarios driving a real `TcpServer` + `Channel` pair over loopback TCP.

use std::sync::Arc;
use std::thread;

use codec::Message;
use demos::order_service::{OrderRequest, OrderResponse, OrderService};
use net::{NetAddr, TcpServer};
use rpc::{Channel, Controller, Dispatcher, ErrorKind};

struct Harness {
    addr: NetAddr,
    waker: Arc<mio::Waker>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Harness {
    fn start() -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        dispatcher.register(Arc::new(OrderService));
        let handler: net::RequestHandler = Arc::new(move |frame, peer_addr| dispatcher.dispatch(frame, peer_addr));

        let mut server = TcpServer::bind(NetAddr::parse("127.0.0.1:0").unwrap(), handler, 1).expect("bind loopback server");
        let addr = server.local_addr().clone();
        let waker = server.waker();

        let handle = thread::spawn(move || {
            let _ = server.run();
        });

        Harness { addr, waker, handle: Some(handle) }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.waker.wake();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn call(addr: &NetAddr, method: &str, request: OrderRequest, timeout_ms: u64) -> (Result<Vec<u8>, ErrorKind>, Controller) {
    let mut controller = Controller::new();
    controller.set_timeout_ms(timeout_ms);
    let mut channel = Channel::new(addr.clone());
    channel.init();
    let result = channel.call_method(&mut controller, method, &request);
    (result, controller)
}

#[test]
fn happy_path_call_succeeds() {
    let harness = Harness::start();

    let (result, controller) = call(&harness.addr, "Order.makeOrder", OrderRequest { price: 100, goods: "apple".to_string() }, 5000);

    assert!(!controller.failed());
    assert_eq!(controller.msg_id().len(), 20);
    let response = OrderResponse::decode(&result.unwrap()).unwrap();
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
fn under_limit_order_is_rejected_at_application_level_not_rpc_level() {
    let harness = Harness::start();

    let (result, controller) = call(&harness.addr, "Order.makeOrder", OrderRequest { price: 5, goods: "apple".to_string() }, 5000);

    assert!(!controller.failed(), "the RPC call itself succeeds");
    let response = OrderResponse::decode(&result.unwrap()).unwrap();
    assert_eq!(response.ret_code, -1);
    assert_eq!(response.res_info, "short of money");
}

#[test]
fn slow_handler_times_out_before_it_replies() {
    let harness = Harness::start();
    let started = std::time::Instant::now();

    let (result, controller) = call(&harness.addr, "Order.slowOrder", OrderRequest { price: 100, goods: "apple".to_string() }, 1000);

    let elapsed = started.elapsed();
    assert_eq!(result.unwrap_err(), ErrorKind::RpcCallTimeout);
    assert!(controller.failed());
    assert!(controller.is_canceled());
    assert!(elapsed.as_millis() >= 1000, "fired before the deadline: {elapsed:?}");
    assert!(elapsed.as_millis() < 4000, "did not return until the handler's own sleep elapsed: {elapsed:?}");
}

#[test]
fn unknown_method_reports_method_not_found() {
    let harness = Harness::start();

    let mut controller = Controller::new();
    controller.set_timeout_ms(5000);
    let mut channel = Channel::new(harness.addr.clone());
    channel.init();

    let result = channel.call_method(&mut controller, "Order.noSuchMethod", &Vec::<u8>::new());

    assert_eq!(result.unwrap_err(), ErrorKind::MethodNotFound);
    assert!(controller.failed());
}
