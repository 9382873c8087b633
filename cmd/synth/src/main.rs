//! Synthetic workload - many threads hammering one probe
//!
//! Drives the configured tool (MPR_TOOL, default dirty-pages) with
//! pseudo-random blocks and memory operands from N host threads.
//!
//! Usage: synth [threads] [blocks-per-thread]

use memprobe::{kerror, Probe, ProbeConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Bytes of synthetic heap each thread scatters writes across
const SPAN: u64 = 1 << 22;

fn main() {
    println!("=== memprobe Synthetic Workload ===\n");

    let mut args = std::env::args().skip(1);
    let num_threads: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(4);
    let blocks: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(100_000);

    let config = ProbeConfig::from_env();
    let config = if config.max_threads < num_threads {
        config.max_threads(num_threads)
    } else {
        config
    };

    println!("Tool:      {}", config.tool);
    println!("Output:    {}", config.output_path.display());
    println!("Threads:   {}", num_threads);
    println!("Blocks:    {} per thread\n", blocks);

    let probe = match Probe::new(config) {
        Ok(p) => p,
        Err(e) => {
            kerror!("startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let accesses = AtomicU64::new(0);
    let start = Instant::now();

    std::thread::scope(|s| {
        for t in 0..num_threads as u64 {
            let probe = &probe;
            let accesses = &accesses;
            s.spawn(move || {
                let ctx = probe.attach(1000 + t);
                let base = 0x1000_0000 + t * SPAN;
                let mut rng = t.wrapping_add(0x9e37_79b9);
                let mut local = 0u64;

                for b in 0..blocks {
                    rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                    let ip = 0x40_0000 + (b & 0xfff) * 4;
                    let addr = base + (rng >> 16) % SPAN;
                    let size = 1u32 << ((rng >> 8) & 3);

                    ctx.read(ip, addr, size);
                    if rng & 3 == 0 {
                        ctx.write(ip + 2, addr, size);
                        local += 1;
                    }
                    local += 1;
                    ctx.block(((rng >> 4) & 15) as u32 + 1);
                }

                accesses.fetch_add(local, Ordering::Relaxed);
            });
        }
    });

    let run_time = start.elapsed();
    let exit = probe.finish(0);

    println!("\n=== Results ===");
    println!("Accesses:        {}", accesses.load(Ordering::Relaxed));
    println!("Run time:        {:?}", run_time);
    println!(
        "Throughput:      {:.0} accesses/sec",
        accesses.load(Ordering::Relaxed) as f64 / run_time.as_secs_f64()
    );

    if let Err(e) = exit {
        kerror!("exit failed: {}", e);
        std::process::exit(1);
    }
    println!("\n=== Synthetic Workload Complete ===");
}
