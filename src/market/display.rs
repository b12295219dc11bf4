//! Rupee formatting for rendered figures.

/// Group an integer string the Indian way: last three digits, then pairs.
/// `"1234567"` → `"12,34,567"`.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, right) = rest.split_at(rest.len() - 2);
        groups.push(right);
        rest = left;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

/// Whole rupees with Indian digit grouping: `123456.7` → `"₹1,23,457"`.
pub fn format_rupees(amount: f64) -> String {
    if !amount.is_finite() {
        return "₹—".to_string();
    }
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());
    format!("{sign}₹{}", group_indian(&digits))
}

/// Price per quintal as shown on market cards.
pub fn format_price_per_quintal(amount: f64) -> String {
    format!("{}/qtl", format_rupees(amount))
}
