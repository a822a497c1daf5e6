use rand::Rng;

/// Generates a session id for an `o=` line.
///
/// JSEP wants a 64-bit quantity with the high bit cleared so it survives
/// signed parsers.
pub fn new_session_id() -> u64 {
    rand::thread_rng().gen::<u64>() & !(1u64 << 63)
}
