use super::ScriptContext;
use crate::chain::confirm;
use crate::chain::contracts::FactoryERC1155;
use alloy::primitives::U256;
use anyhow::{Context, Result};
use log::info;

pub const CONTRACT_NAME: &str = "FactoryERC1155";

const TOKEN_CONTRACT_NAME: &str = "LoyaltyNFT";
const RETAILER_NAME: &str = "Adidas";
const RETAILER_TOKEN_ID: u64 = 1;
const MINT_AMOUNT: u64 = 24;
const METADATA_URI: &str =
    "ipfs://bafyreie5k4fycgqef6hfphpplrfixvnz44fgvdffi5wsbq2m7ivi5yqr4m/metadata.json";

/// Deploy the ERC1155 factory, create the loyalty token through it, register a
/// retailer and mint its first batch.
pub async fn run(ctx: &mut ScriptContext) -> Result<()> {
    let (artifact, deployment) = ctx.deploy_contract(CONTRACT_NAME, &[]).await?;
    ctx.verify_if_supported(&artifact, &deployment, &[]).await?;

    let factory = FactoryERC1155::new(deployment.address, ctx.client.provider.clone());
    let sender = ctx.client.sender;

    // Create LoyaltyNFT token
    let create = factory
        .deployERC1155(
            TOKEN_CONTRACT_NAME.to_string(),
            String::new(),
            Vec::new(),
            Vec::new(),
        )
        .from(sender);
    let token_address = create
        .call()
        .await
        .context("deployERC1155 static call failed")?;
    let receipt = confirm(create.send().await.context("deployERC1155 failed")?, 1).await?;
    info!("{} token contract: {}", TOKEN_CONTRACT_NAME, token_address);
    ctx.log_receipt(CONTRACT_NAME, "deployERC1155", &receipt);

    // Add retailer
    let index = U256::ZERO;
    let pending = factory
        .addRetailer(
            index,
            RETAILER_NAME.to_string(),
            U256::from(RETAILER_TOKEN_ID),
        )
        .from(sender)
        .send()
        .await
        .context("addRetailer failed")?;
    let receipt = confirm(pending, 1).await?;
    ctx.log_receipt(CONTRACT_NAME, "addRetailer", &receipt);

    // Mint NFT for the retailer
    let pending = factory
        .mintERC1155(
            index,
            RETAILER_NAME.to_string(),
            U256::from(MINT_AMOUNT),
            METADATA_URI.to_string(),
        )
        .from(sender)
        .send()
        .await
        .context("mintERC1155 failed")?;
    let receipt = confirm(pending, 1).await?;
    ctx.log_receipt(CONTRACT_NAME, "mintERC1155", &receipt);

    ctx.finish().await
}
