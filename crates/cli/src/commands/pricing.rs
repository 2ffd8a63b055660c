//! `shellpilot pricing`: per-model token prices.

use crate::commands::load_config;
use shellpilot_telemetry::PricingTable;

pub fn run() -> anyhow::Result<()> {
    let config = load_config()?;
    let table = PricingTable::from_config(&config);

    println!("Model pricing (USD per 1M tokens)");
    println!("{:<36} {:>10} {:>10}", "Model", "Input", "Output");
    for (model, price) in table.entries() {
        println!("{:<36} {:>10.3} {:>10.3}", model, price.input_per_m, price.output_per_m);
    }
    let fallback = table.fallback();
    println!(
        "{:<36} {:>10.3} {:>10.3}",
        "(any other model)", fallback.input_per_m, fallback.output_per_m
    );
    println!();
    println!("Configured model: {}", config.model);
    Ok(())
}
