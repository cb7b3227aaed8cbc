//! # Basic Example
//!
//! One static HTTP client, one discovery-bound HTTP client and one reporting service,
//! hosted against the in-process `MemoryCluster`.
//!
//! While the service runs, the demo moves the `ip` service to a new endpoint and changes
//! its options; the discovery-bound client is reconfigured without a restart.
//!
//! ## Run
//! ```bash
//! cargo run --example basic --features "logging http"
//! ```

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use hostvisor::builtin::http::{Balancer, HttpClient, HttpClientOptions};
use hostvisor::{
    ClientConfig, Config, Endpoint, LogWriter, MemoryCluster, OrchestratorBuilder, Registry,
    ServiceFn, ServiceSpec, Subscribe,
};
use tokio_util::sync::CancellationToken;

/// Always picks the heaviest endpoint.
#[derive(Default)]
struct Heaviest(Mutex<Vec<Endpoint>>);

impl Balancer for Heaviest {
    fn reset(&self, endpoints: &[Endpoint]) {
        *self.0.lock().unwrap() = endpoints.to_vec();
    }

    fn next(&self) -> Option<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .max_by_key(|e| e.weight)
            .map(|e| e.addr.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hostvisor=debug".into()),
        )
        .init();

    let cluster = MemoryCluster::new("local");
    let ip_broker = cluster.broker("ip");
    ip_broker.setenv("options", r#"{"scheme":"http","timeout":800}"#).await;
    ip_broker
        .update_endpoint(Endpoint::new("n0", "127.0.0.1:9000", 10))
        .await;

    // Clients register through the shared registry, anywhere before run.
    let registry = Registry::new();
    let billing = Arc::new(HttpClient::new(Heaviest::default()));
    registry.register(
        billing.clone(),
        ClientConfig::Static(
            HttpClientOptions::new("billing")
                .with_endpoints(vec![Endpoint::new("b1", "127.0.0.1:7000", 1)]),
        ),
        "billing api",
    )?;
    let ip = Arc::new(HttpClient::new(Heaviest::default()));
    registry.register(ip.clone(), ClientConfig::discovery("ip"), "ip lookup")?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let orch = OrchestratorBuilder::new(Config::default())
        .with_registry(registry)
        .with_subscribers(subs)
        .build();
    orch.join(cluster.clone());

    let lookup = {
        let ip = Arc::clone(&ip);
        ServiceFn::arc("lookup", move |ctx: CancellationToken| {
            let ip = Arc::clone(&ip);
            let billing = Arc::clone(&billing);
            async move {
                if let Ok(url) = billing.build_url("invoices") {
                    println!("billing -> GET {url}");
                }
                while !ctx.is_cancelled() {
                    match ip.build_url("/v1/ip") {
                        Ok(url) => println!("lookup -> GET {url}"),
                        Err(e) => println!("lookup -> {e}"),
                    }
                    tokio::select! {
                        _ = ctx.cancelled() => {}
                        _ = tokio::time::sleep(Duration::from_millis(200)) => {}
                    }
                }
            }
        })
    };
    orch.setup(
        ServiceSpec::new(lookup, "resolves the ip service")
            .with_auto_report("127.0.0.1:8080", 100, 10),
    );
    print!("{}", orch.overview());

    let ctx = CancellationToken::new();
    let driver = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            ip_broker
                .update_endpoint(Endpoint::new("n1", "127.0.0.1:9001", 50))
                .await;
            tokio::time::sleep(Duration::from_millis(500)).await;
            ip_broker.setenv("options", r#"{"scheme":"https"}"#).await;
            tokio::time::sleep(Duration::from_millis(500)).await;
            ctx.cancel();
        })
    };

    orch.run(ctx).await?;
    driver.await?;

    if let Some(reporter) = cluster.reporter("lookup") {
        println!("reporter calls: {:?}", reporter.calls());
    }
    Ok(())
}
