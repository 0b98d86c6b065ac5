//! WhatsApp deep links. Orders are taken over WhatsApp; checkout responds
//! with a `wa.me` link preloaded with the order summary.

use rust_decimal::Decimal;

/// Builds `https://wa.me/{phone}?text=...` for a placed order.
pub fn order_link(phone: &str, order_id: &str, total: Decimal, currency: &str) -> String {
    let message = format!("Hola! Acabo de realizar el pedido {order_id} por {total} {currency}.");
    format!("https://wa.me/{}?text={}", phone, percent_encode(&message))
}

/// Minimal percent-encoder for the `text` query parameter (RFC 3986
/// unreserved characters pass through).
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
