//! Fetches the dog collection from a DogPatch server and prints it.
//!
//! Callbacks are delivered on a dedicated serial queue, the way a UI
//! application would route them onto its main thread.
//!
//! Run with: `cargo run --example fetch_dogs -- https://example.com/api/v1/`

use dogpatch::{executor::SerialQueue, transport::HttpTransport, Client, Error};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("dogpatch=debug,fetch_dogs=info")
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080/api/v1/".to_string());

    let transport = HttpTransport::builder()
        .timeout(Duration::from_secs(10))
        .default_header("User-Agent", "dogpatch-demo/0.1")?
        .build()?;
    let responses = Arc::new(SerialQueue::new("responses")?);
    let client = Client::new(&base_url, transport, Some(responses))?;

    println!("=== GET {}dogs ===", client.base_url());

    let (tx, rx) = tokio::sync::oneshot::channel();
    client.get_dogs(move |outcome| {
        let thread = std::thread::current().name().unwrap_or("unnamed").to_string();
        match outcome {
            Ok(Some(dogs)) => {
                println!("Received {} dogs on '{}':", dogs.len(), thread);
                for dog in &dogs {
                    println!("  {} ({}) - ${:.2}", dog.name, dog.breed, dog.cost);
                }
            }
            Ok(None) => println!("No dogs this time (received on '{}')", thread),
            Err(Error::DeserializationFailed { serde_error, raw_response, .. }) => {
                eprintln!("Failed to decode dogs: {}", serde_error);
                eprintln!("  Raw response: {}", raw_response);
            }
            Err(e) => eprintln!("Request failed: {}", e),
        }
        let _ = tx.send(());
    });

    // The callback runs on the queue thread; wait for it before exiting.
    let _ = rx.await;

    Ok(())
}
