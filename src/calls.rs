use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::{
    primitives::{keccak256, Address, Bytes, B256, U256},
    sol_types::SolValue,
};

use crate::{
    bindings::{FungibleAssetOrder, Ucs03Zkgm::Instruction},
    config::AssetConfig,
};

/// Version and opcode of the outer instruction handed to `send`.
pub const BATCH_VERSION: u8 = 0;
pub const BATCH_OPCODE: u8 = 2;

/// Version and opcode of the single order wrapped by the batch.
pub const ASSET_ORDER_VERSION: u8 = 1;
pub const ASSET_ORDER_OPCODE: u8 = 3;

/// How long the destination chain has to receive the packet.
pub const TIMEOUT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// A cross-chain fungible asset transfer, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOrder {
    pub sender: Address,
    pub receiver: Address,
    pub base_token: Address,
    pub base_amount: U256,
    pub base_token_symbol: String,
    pub base_token_name: String,
    pub base_token_decimals: u8,
    pub base_token_path: U256,
    pub quote_token: Address,
    pub quote_amount: U256,
}

impl TransferOrder {
    /// Order that moves `asset` from `wallet` to the same address on the
    /// destination chain.
    pub fn for_wallet(asset: &AssetConfig, wallet: Address) -> Self {
        Self {
            sender: wallet,
            receiver: wallet,
            base_token: asset.base_token,
            base_amount: U256::from(asset.amount),
            base_token_symbol: asset.symbol.clone(),
            base_token_name: asset.name.clone(),
            base_token_decimals: asset.decimals,
            base_token_path: U256::ZERO,
            quote_token: asset.quote_token,
            quote_amount: U256::from(asset.amount),
        }
    }

    /// Encodes the order as a one-element batch instruction.
    pub fn instruction(&self) -> Instruction {
        let order: FungibleAssetOrder = self.into();
        let inner = Instruction {
            version: ASSET_ORDER_VERSION,
            opcode: ASSET_ORDER_OPCODE,
            operand: order.abi_encode_params().into(),
        };
        let batch: Bytes = vec![inner].abi_encode().into();

        Instruction {
            version: BATCH_VERSION,
            opcode: BATCH_OPCODE,
            operand: batch,
        }
    }
}

impl From<&TransferOrder> for FungibleAssetOrder {
    fn from(order: &TransferOrder) -> Self {
        FungibleAssetOrder {
            sender: order.sender.to_vec().into(),
            receiver: order.receiver.to_vec().into(),
            baseToken: order.base_token.to_vec().into(),
            baseAmount: order.base_amount,
            baseTokenSymbol: order.base_token_symbol.clone(),
            baseTokenName: order.base_token_name.clone(),
            baseTokenDecimals: order.base_token_decimals,
            baseTokenPath: order.base_token_path,
            quoteToken: order.quote_token.to_vec().into(),
            quoteAmount: order.quote_amount,
        }
    }
}

/// Arguments of one `send` call. Built fresh for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeCall {
    pub channel_id: u32,
    pub timeout_height: u64,
    pub timeout_timestamp: u64,
    pub salt: B256,
    pub instruction: Instruction,
}

impl BridgeCall {
    pub fn new(order: &TransferOrder, channel_id: u32, now: SystemTime) -> Self {
        let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
        let timeout = (since_epoch + TIMEOUT_WINDOW).as_nanos();

        Self {
            channel_id,
            timeout_height: 0,
            timeout_timestamp: u64::try_from(timeout).unwrap_or(u64::MAX),
            salt: salt(order.sender, since_epoch.as_secs()),
            instruction: order.instruction(),
        }
    }
}

/// keccak256 of the packed `(address, uint256 seconds)` pair.
pub fn salt(sender: Address, unix_secs: u64) -> B256 {
    keccak256((sender, U256::from(unix_secs)).abi_encode_packed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, hex};
    use pretty_assertions::assert_eq;

    // Operand previously spliced by hand around the sender address.
    const HEAD: &str = concat!(
        "0000000000000000000000000000000000000000000000000000000000000020",
        "0000000000000000000000000000000000000000000000000000000000000001",
        "0000000000000000000000000000000000000000000000000000000000000020",
        "0000000000000000000000000000000000000000000000000000000000000001",
        "0000000000000000000000000000000000000000000000000000000000000003",
        "0000000000000000000000000000000000000000000000000000000000000060",
        "00000000000000000000000000000000000000000000000000000000000002c0",
        "0000000000000000000000000000000000000000000000000000000000000140",
        "0000000000000000000000000000000000000000000000000000000000000180",
        "00000000000000000000000000000000000000000000000000000000000001c0",
        "0000000000000000000000000000000000000000000000000000000000002710",
        "0000000000000000000000000000000000000000000000000000000000000200",
        "0000000000000000000000000000000000000000000000000000000000000240",
        "0000000000000000000000000000000000000000000000000000000000000006",
        "0000000000000000000000000000000000000000000000000000000000000000",
        "0000000000000000000000000000000000000000000000000000000000000280",
        "0000000000000000000000000000000000000000000000000000000000002710",
        "0000000000000000000000000000000000000000000000000000000000000014",
    );
    const MIDDLE: &str = concat!(
        "000000000000000000000000",
        "0000000000000000000000000000000000000000000000000000000000000014",
    );
    const TAIL: &str = concat!(
        "000000000000000000000000",
        "0000000000000000000000000000000000000000000000000000000000000014",
        "1c7d4b196cb0c7b01d743fbc6116a902379c7238000000000000000000000000",
        "0000000000000000000000000000000000000000000000000000000000000004",
        "5553444300000000000000000000000000000000000000000000000000000000",
        "0000000000000000000000000000000000000000000000000000000000000004",
        "5553444300000000000000000000000000000000000000000000000000000000",
        "0000000000000000000000000000000000000000000000000000000000000014",
        "57978bfe465ad9b1c0bf80f6c1539d300705ea50000000000000000000000000",
    );

    #[test]
    fn encodes_the_known_sepolia_operand() {
        let wallet = address!("5FbE74A283f7954f10AA04C2eDf55578811aeb03");
        let order = TransferOrder::for_wallet(&AssetConfig::default(), wallet);
        let instruction = order.instruction();

        let addr = hex::encode(wallet);
        let expected = hex::decode(format!("{HEAD}{addr}{MIDDLE}{addr}{TAIL}")).unwrap();

        assert_eq!(instruction.version, 0);
        assert_eq!(instruction.opcode, 2);
        assert_eq!(hex::encode(&instruction.operand), hex::encode(expected));
    }

    #[test]
    fn operand_changes_only_with_the_sender() {
        let asset = AssetConfig::default();
        let a = TransferOrder::for_wallet(&asset, Address::repeat_byte(0x11)).instruction();
        let b = TransferOrder::for_wallet(&asset, Address::repeat_byte(0x22)).instruction();

        assert_eq!(a.operand.len(), b.operand.len());
        let differing = a
            .operand
            .iter()
            .zip(b.operand.iter())
            .filter(|(x, y)| x != y)
            .count();
        assert_eq!(differing, 40);
    }

    #[test]
    fn bridge_call_timeout_is_one_day_ahead() {
        let order = TransferOrder::for_wallet(&AssetConfig::default(), Address::ZERO);
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let call = BridgeCall::new(&order, 8, now);

        assert_eq!(call.channel_id, 8);
        assert_eq!(call.timeout_height, 0);
        assert_eq!(
            call.timeout_timestamp,
            (1_700_000_000u64 + 86_400) * 1_000_000_000
        );
        assert_eq!(call.salt, salt(Address::ZERO, 1_700_000_000));
    }

    #[test]
    fn salt_hashes_packed_address_and_seconds() {
        let sender = Address::repeat_byte(0xab);
        let mut packed = sender.to_vec();
        packed.extend_from_slice(&U256::from(42u64).to_be_bytes::<32>());

        assert_eq!(salt(sender, 42), keccak256(packed));
        assert_ne!(salt(sender, 42), salt(sender, 43));
    }
}
