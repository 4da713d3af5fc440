/// XOR of every byte between `$` and `*`.
pub fn compute(payload: &str) -> u8 {
    payload.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Frames `body` (the text between `$` and `*`) as a complete sentence.
pub fn encode(body: &str) -> String {
    format!("${}*{:02X}", body, compute(body))
}

/// Parses the two trailing hex digits of a sentence.
pub fn parse_hex(digits: &str) -> Option<u8> {
    if digits.len() != 2 {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}
