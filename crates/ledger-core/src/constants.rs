pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// A difficulty counts leading `'0'` hex characters, so it can never exceed the digest width.
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const DEFAULT_BATCH_SIZE: usize = 3;
/// Rendered in place of a digest that does not exist (no predecessor, empty tree).
pub const ABSENT_DIGEST_REPR: &str = "None";
