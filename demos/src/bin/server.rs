//! Demo RPC server: loads configuration, initializes logging, registers the `Order`
//! service, and runs the Main Reactor with a configurable number of Worker Reactors.

use std::process::ExitCode;
use std::sync::Arc;

use demos::order_service::OrderService;
use net::{NetAddr, TcpServer};
use rpc::Dispatcher;

fn main() -> ExitCode {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "rapidrpc.xml".to_string());

    let config = match config::Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config {config_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    if config::set_global(config.clone()).is_err() {
        eprintln!("config already initialized");
        return ExitCode::FAILURE;
    }
    let _logging_guards = logging::init(config::global());

    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.register(Arc::new(OrderService));

    let handler: net::RequestHandler = Arc::new(move |frame, peer_addr| dispatcher.dispatch(frame, peer_addr));

    let Some(addr) = NetAddr::from_host_port(&config.server_ip, config.server_port) else {
        tracing::error!(ip = %config.server_ip, port = config.server_port, "invalid server address");
        return ExitCode::FAILURE;
    };

    let mut server = match TcpServer::bind(addr, handler, config.server_io_threads) {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(?err, "failed to bind server");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(addr = %server.local_addr(), workers = config.server_io_threads, "rpc server listening");

    if let Err(err) = server.run() {
        tracing::error!(?err, "server exited with an error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
