use std::error::Error;

use screener::config::Settings;
use screener::{logging, pipeline};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init();
    info!("Starting program execution...");

    let settings = Settings::new()?;
    let config = settings.pipeline_config()?;
    let outputs = pipeline::run(&config, &settings).await?;

    for ticker in outputs.summary.tickers() {
        if let Some(p) = outputs.summary.get(ticker) {
            info!(
                "{}: annual return {:.4}, volatility {:.4}, Sharpe {:.4}",
                ticker, p.annual_return, p.volatility, p.sharpe_ratio
            );
        }
    }

    info!("Program finished successfully.");
    Ok(())
}
