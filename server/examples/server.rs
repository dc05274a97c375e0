//! A minimal server over the `Null` backend: every client is unknown and
//! handled (or not) by the hooks. Point a configuration at a real backend
//! to serve actual definitions.

extern crate env_logger;
extern crate futures;
extern crate server;
extern crate tokio;

use std::sync::Arc;

use futures::Future;

fn main() {
    env_logger::init();

    let server_ip = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "192.168.0.1".to_owned())
        .parse()
        .expect("the first argument must be the server's IPv4 address");

    let config = server::Config::new(server_ip);
    let (server, _control) = server::Server::new(
        config,
        Arc::new(server::Null),
        Arc::new(server::DefaultHooks),
    )
    .expect("unable to bind the DHCP sockets");

    tokio::run(server.map_err(|error| eprintln!("server failed: {}", error)));
}
