use simulation::{run_simulation, SimulationConfig};
use tracing_subscriber::EnvFilter;
pub mod simulation;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            AUTO-SAVE SOAK TESTS                            ║");
    println!("║  Started: {:<48} ║", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("╚════════════════════════════════════════════════════════════╝");

    let runs = [
        // Test 1: reliable server
        SimulationConfig { editors: 4, bursts_per_editor: 20, failure_rate: 0.0, seed: 1 },
        // Test 2: occasional outages
        SimulationConfig { editors: 10, bursts_per_editor: 50, failure_rate: 0.1, seed: 2 },
        // Test 3: mostly down
        SimulationConfig { editors: 10, bursts_per_editor: 50, failure_rate: 0.6, seed: 3 },
        // Test 4: many editors
        SimulationConfig { editors: 100, bursts_per_editor: 20, failure_rate: 0.2, seed: 4 },
    ];

    let mut inconsistent = 0;
    for config in runs {
        let stats = run_simulation(config).await;
        stats.print();
        if !stats.is_consistent() {
            inconsistent += stats.editors - stats.consistent_editors;
        }
    }

    if inconsistent > 0 {
        anyhow::bail!("{} editors finished with unsaved or diverged content", inconsistent);
    }

    println!("\n✓ All soak tests completed successfully!");
    Ok(())
}
