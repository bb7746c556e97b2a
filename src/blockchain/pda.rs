//! PDA derivation for the BOOM protocol accounts

use solana_sdk::pubkey::Pubkey;

/// Seed of the singleton protocol state account
pub const PROTOCOL_SEED: &[u8] = b"protocol";

/// Seed prefix of the per-mint boom token state account
pub const BOOM_TOKEN_SEED: &[u8] = b"boom_token";

/// Derive the protocol state PDA
pub fn protocol_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[PROTOCOL_SEED], program_id)
}

/// Derive the boom token state PDA for a mint
pub fn boom_token_pda(program_id: &Pubkey, mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[BOOM_TOKEN_SEED, mint.as_ref()], program_id)
}
