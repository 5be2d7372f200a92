use crate::config::GasReporterConfig;
use crate::errors::{DeployError, DeployResult};
use alloy::primitives::utils::format_units;
use alloy::primitives::U256;
use alloy::rpc::types::TransactionReceipt;
use comfy_table::presets::{ASCII_FULL, UTF8_FULL};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use log::{info, warn};
use std::fs;

const CMC_QUOTES_URL: &str = "https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest";

#[derive(Debug, Clone, PartialEq)]
pub struct GasRecord {
    pub contract: String,
    pub method: String,
    pub gas_used: u64,
    pub gas_price_wei: u128,
}

impl GasRecord {
    pub fn cost_wei(&self) -> U256 {
        U256::from(self.gas_used) * U256::from(self.gas_price_wei)
    }

    /// Cost in whole native tokens
    pub fn cost_native(&self) -> f64 {
        format_units(self.cost_wei(), 18)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

#[async_trait::async_trait]
pub trait PriceFeed: Send + Sync {
    /// Price of one `token` expressed in `currency`
    async fn price(&self, token: &str, currency: &str) -> DeployResult<f64>;
}

pub struct CoinMarketCap {
    client: reqwest::Client,
    api_key: String,
}

impl CoinMarketCap {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl PriceFeed for CoinMarketCap {
    async fn price(&self, token: &str, currency: &str) -> DeployResult<f64> {
        let body: serde_json::Value = self
            .client
            .get(CMC_QUOTES_URL)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .query(&[("symbol", token), ("convert", currency)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_quote(&body, token, currency)
    }
}

pub fn parse_quote(body: &serde_json::Value, token: &str, currency: &str) -> DeployResult<f64> {
    body.get("data")
        .and_then(|data| data.get(token))
        .and_then(|entry| entry.get("quote"))
        .and_then(|quote| quote.get(currency))
        .and_then(|quote| quote.get("price"))
        .and_then(|price| price.as_f64())
        .ok_or_else(|| DeployError::Pricing(format!("No {} quote for {}", currency, token)))
}

/// Collects the gas of every transaction a script sends
pub struct GasReporter {
    config: GasReporterConfig,
    records: Vec<GasRecord>,
}

impl GasReporter {
    pub fn new(config: GasReporterConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
        }
    }

    pub fn record(&mut self, contract: &str, method: &str, gas_used: u64, gas_price_wei: u128) {
        self.records.push(GasRecord {
            contract: contract.to_string(),
            method: method.to_string(),
            gas_used,
            gas_price_wei,
        });
    }

    pub fn record_receipt(&mut self, contract: &str, method: &str, receipt: &TransactionReceipt) {
        self.record(
            contract,
            method,
            receipt.gas_used,
            receipt.effective_gas_price,
        );
    }

    pub fn total_gas(&self) -> u64 {
        self.records.iter().map(|r| r.gas_used).sum()
    }

    pub fn render(&self, price: Option<f64>) -> String {
        let token = &self.config.token;
        let currency = &self.config.currency;

        let mut columns = vec![
            "Contract".to_string(),
            "Method".to_string(),
            "Gas used".to_string(),
            "Gas price (gwei)".to_string(),
            format!("Cost ({})", token),
        ];
        if price.is_some() {
            columns.push(format!("Cost ({})", currency));
        }

        let mut table = Table::new();
        if self.config.no_colors {
            table.load_preset(ASCII_FULL).force_no_tty();
        } else {
            table.load_preset(UTF8_FULL).enforce_styling();
        }
        table
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(columns.into_iter().map(|column| {
                let cell = Cell::new(column);
                if self.config.no_colors {
                    cell
                } else {
                    cell.add_attribute(Attribute::Bold)
                }
            }));

        for record in &self.records {
            let native = record.cost_native();
            let mut row = vec![
                Cell::new(&record.contract),
                Cell::new(&record.method),
                Cell::new(record.gas_used),
                Cell::new(format!("{:.2}", record.gas_price_wei as f64 / 1e9)),
                Cell::new(format!("{:.6}", native)),
            ];
            if let Some(price) = price {
                row.push(Cell::new(format!("{:.2}", native * price)));
            }
            table.add_row(row);
        }

        let title = format!(
            "Gas report ({})",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        let price_line = match price {
            Some(price) => format!("{} price: {:.4} {}", token, price, currency),
            None => format!("{} price: unavailable", token),
        };
        format!(
            "{}\n{}\n\n{}\n\nTotal gas: {}\n",
            title,
            price_line,
            table,
            self.total_gas()
        )
    }

    /// Price the records and write the report to the configured output.
    pub async fn emit(&self, feed: Option<&dyn PriceFeed>) -> DeployResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        if self.records.is_empty() {
            info!("Gas reporter: no transactions recorded");
            return Ok(());
        }

        let price = match feed {
            Some(feed) => match feed.price(&self.config.token, &self.config.currency).await {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!("Gas reporter could not fetch a price: {}", e);
                    None
                }
            },
            None => None,
        };

        let report = self.render(price);
        match &self.config.output_file {
            Some(path) => {
                fs::write(path, &report)?;
                info!("Gas report written to {}", path);
            }
            None => println!("{}", report),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use tempfile::TempDir;

    const BOLD: &str = "\x1b[1m";

    struct FixedPrice(Option<f64>);

    #[async_trait::async_trait]
    impl PriceFeed for FixedPrice {
        async fn price(&self, _token: &str, _currency: &str) -> DeployResult<f64> {
            self.0
                .ok_or_else(|| DeployError::Pricing("unavailable".to_string()))
        }
    }

    fn reporter() -> GasReporter {
        let mut reporter = GasReporter::new(Config::default().gas_reporter);
        // 1,000,000 gas at 30 gwei = 0.03 native
        reporter.record("FactoryERC1155", "deployment", 1_000_000, 30_000_000_000);
        reporter.record("FactoryERC1155", "addRetailer", 50_000, 30_000_000_000);
        reporter
    }

    #[test]
    fn test_cost_native() {
        let record = GasRecord {
            contract: "FactoryERC1155".to_string(),
            method: "deployment".to_string(),
            gas_used: 1_000_000,
            gas_price_wei: 30_000_000_000,
        };
        assert!((record.cost_native() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_render_with_price() {
        let report = reporter().render(Some(2.0));
        assert!(report.contains("Cost (MATIC)"));
        assert!(report.contains("Cost (USD)"));
        assert!(report.contains("0.030000"));
        assert!(report.contains("0.06"));
        assert!(report.contains("Total gas: 1050000"));
        assert!(report.contains("| FactoryERC1155 | addRetailer"));
        assert!(!report.contains(BOLD));
    }

    #[test]
    fn test_render_without_price() {
        let report = reporter().render(None);
        assert!(!report.contains("Cost (USD)"));
        assert!(report.contains("MATIC price: unavailable"));
    }

    #[test]
    fn test_colors() {
        let mut config = Config::default().gas_reporter;
        config.no_colors = false;
        let mut reporter = GasReporter::new(config);
        reporter.record("MembershipToken", "deployment", 21_000, 1);
        assert!(reporter.render(None).contains(BOLD));
    }

    #[test]
    fn test_parse_quote() {
        let body = json!({
            "status": { "error_code": 0 },
            "data": { "MATIC": { "symbol": "MATIC", "quote": { "USD": { "price": 0.8123 } } } }
        });
        assert_eq!(parse_quote(&body, "MATIC", "USD").unwrap(), 0.8123);
        assert!(parse_quote(&body, "MATIC", "EUR").is_err());
    }

    #[tokio::test]
    async fn test_emit_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gas-report.txt");
        let mut config = Config::default().gas_reporter;
        config.output_file = Some(path.to_string_lossy().to_string());
        let mut reporter = GasReporter::new(config);
        reporter.record("MembershipToken", "deployment", 21_000, 1_000_000_000);

        reporter.emit(Some(&FixedPrice(None))).await.unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("MembershipToken"));
        assert!(written.contains("price: unavailable"));
    }

    #[tokio::test]
    async fn test_disabled_reporter_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gas-report.txt");
        let mut config = Config::default().gas_reporter;
        config.enabled = false;
        config.output_file = Some(path.to_string_lossy().to_string());
        let mut reporter = GasReporter::new(config);
        reporter.record("MembershipToken", "deployment", 21_000, 1);

        reporter.emit(Some(&FixedPrice(Some(1.0)))).await.unwrap();
        assert!(!path.exists());
    }
}
