//! Operator code handling.

/// Split a combined operator code into `(mcc, mnc)`.
///
/// The first three digits are the mobile country code and the remainder the
/// network code. Short codes degrade: `"1234"` → `("123", "4")`,
/// `"123"` → `("123", "")`, `"12"` → `("12", "")`.
pub fn split_operator_code(code: &str) -> (String, String) {
    let code = code.trim();
    let split = code
        .char_indices()
        .nth(3)
        .map(|(index, _)| index)
        .unwrap_or(code.len());
    let (mcc, mnc) = code.split_at(split);
    (mcc.to_string(), mnc.to_string())
}
