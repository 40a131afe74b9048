/// Format invoice number from template
pub fn format_invoice_number(format: &str, year: i32, seq: u32) -> String {
    format
        .replace("{year}", &year.to_string())
        .replace("{seq:05}", &format!("{:05}", seq))
        .replace("{seq:04}", &format!("{:04}", seq))
        .replace("{seq:03}", &format!("{:03}", seq))
        .replace("{seq}", &seq.to_string())
}

/// Next sequence number; the sequence restarts every calendar year.
pub fn next_sequence(last_number: u32, last_year: i32, current_year: i32) -> u32 {
    if last_year == current_year {
        last_number + 1
    } else {
        1
    }
}
