//! Handler for `sign-settlement`.

use serde::Serialize;

use super::command::SignSettlementArgs;
use super::output;
use crate::adapter::outbound::OracleSigner;
use crate::domain::settlement::settlement_digest;
use crate::domain::MarketId;
use crate::error::Result;
use crate::infrastructure::config::settings::ORACLE_PRIVATE_KEY_ENV;

#[derive(Debug, Serialize)]
struct SignatureReport {
    signer: String,
    market_id: u64,
    value: i64,
    price_timestamp: u64,
    digest: String,
    signature: String,
}

/// Execute `sign-settlement`.
pub fn execute(args: &SignSettlementArgs) -> Result<()> {
    let key = std::env::var(ORACLE_PRIVATE_KEY_ENV).unwrap_or_default();
    let oracle = OracleSigner::from_private_key(&key)?;
    let market_id = MarketId::new(args.market_id);
    let signature = oracle.sign_settlement(market_id, args.value, args.price_timestamp)?;

    let report = SignatureReport {
        signer: oracle.address().to_string(),
        market_id: args.market_id,
        value: args.value,
        price_timestamp: args.price_timestamp,
        digest: settlement_digest(market_id, args.value, args.price_timestamp).to_string(),
        signature: signature.to_string(),
    };

    if output::is_json() {
        return output::json(&report);
    }
    output::section("Settlement Signature");
    output::field("Signer", &report.signer);
    output::field("Market", market_id);
    output::field("Value", report.value);
    output::field("Price time", report.price_timestamp);
    output::field("Digest", &report.digest);
    output::field("Signature", &report.signature);
    Ok(())
}
