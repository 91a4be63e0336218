//! Terminal front end: analyze one customer or a batch without the HTTP server.

use clap::Parser;
use customer_health_api::analysis::AnthropicClient;
use customer_health_api::batch::run_batch;
use customer_health_api::config::Config;
use customer_health_api::dashboard::{AnalysisView, BatchDashboard, CustomerView};
use customer_health_api::dataset::CustomerDataset;

#[derive(Debug, Parser)]
#[command(
    name = "analyze_customers",
    about = "AI customer health analysis from the command line"
)]
struct Args {
    /// Analyze the customer with this exact name
    #[arg(long, conflicts_with = "count")]
    customer: Option<String>,

    /// Analyze the first N customers of the dataset
    #[arg(long)]
    count: Option<usize>,

    /// CSV file to read instead of CUSTOMERS_CSV
    #[arg(long)]
    csv: Option<String>,

    /// Print the view as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(csv) = args.csv {
        config.customers_csv = csv;
    }

    let dataset = CustomerDataset::load(&config.customers_csv)?;
    let client = AnthropicClient::new(&config)?;

    match (args.customer, args.count) {
        (Some(name), _) => {
            let record = dataset.lookup_by_name(&name)?;
            let result = client.analyze(record).await?;
            let view = AnalysisView::new(record, result);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_analysis(&view);
            }
        }
        (None, Some(count)) => {
            let records = dataset.prefix(count)?;
            let report = run_batch(&client, records).await?;
            let dashboard = BatchDashboard::new(report);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print_batch(&dashboard);
            }
        }
        (None, None) => {
            println!("=== Customers ({}) ===\n", dataset.len());
            for (idx, record) in dataset.records().iter().enumerate() {
                let view = CustomerView::new(record);
                let summary: Vec<String> = view
                    .metrics
                    .iter()
                    .map(|m| format!("{}: {}", m.label, m.value))
                    .collect();
                println!("[{}] {}\n    {}", idx, record.name, summary.join(" | "));
            }
        }
    }

    Ok(())
}

fn print_analysis(view: &AnalysisView) {
    println!("=== {} ===\n", view.customer.record.name);
    for metric in &view.customer.metrics {
        println!("  {:<20} {}", metric.label, metric.value);
    }
    println!();
    println!(
        "Health Score:     {}/100 ({:?})",
        view.gauge.value, view.gauge.band
    );
    println!("Riesgo de Churn:  {}", view.risk_badge.label);
    println!("\nAnálisis:\n  {}", view.analysis);
    println!("\nRecomendaciones:");
    for rec in &view.recommendations {
        println!("  {}. {}", rec.number, rec.text);
    }
}

fn print_batch(dashboard: &BatchDashboard) {
    println!("=== Métricas Globales ===\n");
    for metric in &dashboard.metrics {
        match &metric.delta {
            Some(delta) => println!("  {:<24} {} ({})", metric.label, metric.value, delta),
            None => println!("  {:<24} {}", metric.label, metric.value),
        }
    }

    println!("\n=== Resultados Detallados ===\n");
    println!(
        "  {:<28} {:>6} {:<8} {:>14} {:>6} {:>8}",
        "Cliente", "Score", "Riesgo", "Revenue", "Días", "Tickets"
    );
    for entry in &dashboard.table {
        let row = &entry.row;
        println!(
            "  {:<28} {:>6} {:<8} {:>14.0} {:>6} {:>8}",
            row.name,
            row.health_score,
            row.churn_risk,
            row.revenue,
            row.days_since_last_activity,
            row.open_tickets
        );
    }

    if !dashboard.failures.is_empty() {
        println!("\n=== Omitidos ===\n");
        for failure in &dashboard.failures {
            println!(
                "  ✗ [{}] {}: {}",
                failure.position, failure.name, failure.error
            );
        }
    }
}
