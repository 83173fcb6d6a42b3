use crate::domain::order::OrderId;

/// Alphabet without look-alike characters (no I, L, O, U) so the tag
/// survives being copied into a bank transfer memo by hand.
const TAG_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTVWXYZ";

/// Derives the human-readable payment reference for an order.
///
/// The order id is embedded directly, which makes collisions impossible for
/// distinct orders; the two-letter tag is a cheap transcription check
/// computed from the same id, so the code is stable across restarts.
pub fn payment_reference(order_id: OrderId) -> String {
    let id = order_id.0;
    // Reduce before multiplying so extreme ids cannot overflow; the tag is
    // unchanged because the modulus distributes over the product.
    let n = (id.unsigned_abs() % TAG_ALPHABET.len() as u64) as usize;
    let first = TAG_ALPHABET[(n * 7 + 3) % TAG_ALPHABET.len()] as char;
    let second = TAG_ALPHABET[(n * 13 + 11) % TAG_ALPHABET.len()] as char;
    format!("SB-{id:06}-{first}{second}")
}
