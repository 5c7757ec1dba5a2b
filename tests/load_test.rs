//! Load testing for the gateway: many clients, few pooled connections.

use std::time::{Duration, Instant};

mod common;

#[tokio::test]
async fn test_load_performance() {
    // 1. Setup Mock Backend
    let backend = common::start_mock_backend("Hello from backend").await;

    // 2. Setup Gateway Config: fewer connections than concurrent clients
    let mut config = common::gateway_config(backend);
    config.pool.size = 4;
    config.pool.acquire_timeout_ms = 10_000;

    // 3. Start Gateway
    let (addr, shutdown) = common::start_gateway(config).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // 4. Run Load Test
    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{addr}/load?user=foo&password=bar");
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            let mut failures = 0usize;
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                match client.get(&url).send().await {
                    Ok(res) if res.status().is_success() => latencies.push(req_start.elapsed()),
                    _ => failures += 1,
                }
            }
            (latencies, failures)
        }));
    }

    let mut all_latencies = Vec::new();
    let mut failures = 0;
    for task in tasks {
        let (latencies, failed) = task.await.unwrap();
        all_latencies.extend(latencies);
        failures += failed;
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(failures, 0, "every request should eventually get a connection");

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("Success Rate:   {}/{}", all_latencies.len(), total_requests);
    println!("-------------------------\n");

    shutdown.trigger();
}
