//! Example: page-view and stock counters replicated across three nodes.
//!
//! Run with `RUST_LOG=debug` to see merge activity.

use std::sync::Arc;
use std::thread;

use crdt_counter::prelude::*;
use crdt_counter::SequentialIds;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Page views (G-Counter) ===\n");

    let ids = SequentialIds::new("edge");
    let nodes: Vec<Arc<GCounter>> = (0..3)
        .map(|_| GCounter::with_source(&ids).map(Arc::new))
        .collect::<Result<_, _>>()?;

    // Each node serves traffic on several threads.
    let handles: Vec<_> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let node = Arc::clone(node);
            thread::spawn(move || {
                for _ in 0..(i + 1) * 100 {
                    node.increment();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().map_err(|_| "worker panicked")?;
    }

    for node in &nodes {
        println!("{} sees {} views locally", node.replica_id(), node.value());
    }

    // Gossip: everyone exchanges state with everyone.
    for a in &nodes {
        for b in &nodes {
            a.merge_state(&b.snapshot());
        }
    }
    println!("\n--- After sync ---");
    for node in &nodes {
        println!("{} sees {} views", node.replica_id(), node.value());
    }

    println!("\n=== Warehouse stock (PN-Counter) ===\n");

    let north = PNCounter::generate()?;
    let south = PNCounter::generate()?;

    north.increment_by(50)?;
    north.decrement_by(12)?;
    south.increment_by(20)?;
    south.decrement_by(30)?;
    println!("north: {}  south: {}", north.value(), south.value());

    if let Err(err) = south.decrement_by(-5) {
        println!("rejected: {err}");
    }

    // Ship only what the peer is missing.
    let delta = north.delta_since(&south.snapshot());
    south.apply_delta(&delta);
    north.merge(&south);
    println!("after sync -> north: {}  south: {}", north.value(), south.value());

    Ok(())
}
