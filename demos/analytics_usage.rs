//! Analytics Usage Example
//!
//! Demonstrates counted cache operations, pattern invalidation, daily history
//! and the live snapshot.
//!
//! Run with: cargo run --example analytics_usage

use cache_analytics::{CacheAnalyticsBuilder, FaultConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Cache Analytics: Usage ===\n");

    // 1. In-memory store, default config
    let system = CacheAnalyticsBuilder::new().build().await?;
    let cache = system.accessor();

    // 2. Populate sessions and a few quotes
    for i in 0..5 {
        cache
            .set(&format!("session:{i}"), b"token", Some(Duration::from_secs(300)))
            .await?;
    }
    let quote = serde_json::json!({ "symbol": "BTC-USD", "bid": 64_210.5, "ask": 64_211.0 });
    cache.set_json("quote:BTC-USD", &quote, None).await?;

    // 3. Lookups: 80 hits, 20 misses
    for i in 0..80 {
        cache.get(&format!("session:{}", i % 5)).await?;
    }
    for i in 0..20 {
        cache.get(&format!("quote:UNKNOWN-{i}")).await?;
    }

    // 4. Pattern invalidation
    let removed = system.invalidation().delete_by_pattern("session:*").await?;
    println!("Removed {removed} session keys");
    let removed_again = system.invalidation().delete_by_pattern("session:*").await?;
    println!("Second sweep removed {removed_again} keys\n");

    // 5. Live snapshot
    let stats = system.reporter().get_current_stats().await;
    println!("=== Live Snapshot ===");
    println!("Backend: {}", stats.backend);
    println!("Hit rate: {:.2}%", stats.hit_rate);
    println!("Hits: {}  Misses: {}", stats.counters.hits, stats.counters.misses);
    println!("Deletes: {}  Pattern deletes: {}", stats.counters.deletes, stats.counters.pattern_deletes);
    println!("Memory used: {} bytes", stats.memory_used_bytes);
    println!("Avg latency: {:.3} ms\n", stats.avg_latency_ms);

    // 6. Daily history
    println!("=== Daily History ===");
    for day in system.reporter().get_daily_stats(7) {
        println!("{}: {} hits, {} misses ({:.1}%)", day.date, day.hits, day.misses, day.hit_rate);
    }
    println!();

    // 7. A flaky store: failures are counted as errors, never as misses
    let flaky = CacheAnalyticsBuilder::new()
        .with_fault_injection(FaultConfig {
            latency: Duration::from_millis(2),
            failure_rate: 0.5,
        })
        .build()
        .await?;
    for i in 0..20 {
        let _ = flaky.accessor().get(&format!("k:{i}")).await;
    }
    let counters = flaky.accessor().counters().snapshot();
    println!("=== Flaky Store ===");
    println!("Misses: {}  Errors: {}", counters.misses, counters.errors);

    Ok(())
}
