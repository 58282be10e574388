use bytes::Bytes;
use std::io::Write;

use micro_http_client::client::{ClientConfig, HttpClient};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

// cargo run --example get -- http://127.0.0.1:8080/
// cargo run --example get -- https://localhost:8443/ ca.pem
#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        error!("usage: get <url> [ca.pem]");
        return;
    };

    let mut config = ClientConfig::new();
    if let Some(ca_path) = args.next() {
        match std::fs::read(&ca_path) {
            Ok(pem) => config = config.ca_certificate(pem),
            Err(e) => {
                error!(path = %ca_path, cause = %e, "read ca certificate error");
                return;
            }
        }
    }

    let client = match HttpClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!(cause = %e, "create client error");
            return;
        }
    };

    let request = match http::Request::get(url.as_str()).body(Bytes::new()) {
        Ok(request) => request,
        Err(e) => {
            error!(cause = %e, "invalid request");
            return;
        }
    };

    let mut exchange = client.exchange();
    let response = match exchange.execute(request).await {
        Ok(response) => response,
        Err(failure) => {
            error!(cause = %failure, "exchange failed");
            return;
        }
    };
    info!(status = response.status_code(), reason = response.status_message(), "receive response");

    let mut stdout = std::io::stdout().lock();
    let mut total = 0;
    loop {
        let chunk = match exchange.read_body(16 * 1024).await {
            Ok(chunk) => chunk,
            Err(e) => {
                error!(cause = %e, "read body error");
                return;
            }
        };

        total += chunk.len();
        if let Err(e) = stdout.write_all(&chunk.data) {
            error!(cause = %e, "write stdout error");
            return;
        }
        if chunk.is_final {
            break;
        }
    }

    info!(body_size = total, keep_alive = exchange.keep_alive(), "body finished");
    if let Err(e) = exchange.close().await {
        error!(cause = %e, "close error");
    }
}
