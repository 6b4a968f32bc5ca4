/// Seed prefix of the escrow record address
pub const ESCROW_SEED: &[u8] = b"escrow";
