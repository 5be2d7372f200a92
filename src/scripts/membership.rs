use super::ScriptContext;
use crate::chain::confirm;
use crate::chain::contracts::MembershipToken;
use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use log::info;

pub const CONTRACT_NAME: &str = "MembershipToken";

const RETAILER_NAME: &str = "Adidas";
const TOKEN_QUANTITY: u64 = 21;
const METADATA_URI: &str =
    "ipfs://bafyreie5k4fycgqef6hfphpplrfixvnz44fgvdffi5wsbq2m7ivi5yqr4m/metadata.json";

/// Deploy the membership token. The retailer setup only runs when `with_setup` is set.
pub async fn run(ctx: &mut ScriptContext, with_setup: bool) -> Result<()> {
    let (artifact, deployment) = ctx.deploy_contract(CONTRACT_NAME, &[]).await?;
    ctx.verify_if_supported(&artifact, &deployment, &[]).await?;

    if with_setup {
        setup_retailer(ctx, deployment.address).await?;
    }

    ctx.finish().await
}

async fn setup_retailer(ctx: &mut ScriptContext, address: Address) -> Result<()> {
    let token = MembershipToken::new(address, ctx.client.provider.clone());
    let sender = ctx.client.sender;

    let pending = token
        .addRetailer(RETAILER_NAME.to_string())
        .from(sender)
        .send()
        .await
        .context("addRetailer failed")?;
    let receipt = confirm(pending, 1).await?;
    info!("Add Retailer Transaction Hash:");
    info!("{}", receipt.transaction_hash);
    ctx.log_receipt(CONTRACT_NAME, "addRetailer", &receipt);

    let token_id = token
        .getTokenIdByRetailerName(RETAILER_NAME.to_string())
        .call()
        .await
        .context("getTokenIdByRetailerName failed")?;
    info!("Token ID for Retailer: {}", RETAILER_NAME);
    info!("{}", token_id);

    let pending = token
        .mintTokens(
            RETAILER_NAME.to_string(),
            U256::from(TOKEN_QUANTITY),
            METADATA_URI.to_string(),
        )
        .from(sender)
        .send()
        .await
        .context("mintTokens failed")?;
    let receipt = confirm(pending, 1).await?;
    info!("Mint Tokens Transaction Hash:");
    info!("{}", receipt.transaction_hash);
    ctx.log_receipt(CONTRACT_NAME, "mintTokens", &receipt);

    Ok(())
}
