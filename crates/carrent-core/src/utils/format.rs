use chrono::NaiveDateTime;

/// Leading characters kept by [`shorten_address`] (`0x` plus four hex digits)
const ADDRESS_HEAD: usize = 6;

/// Trailing characters kept by [`shorten_address`]
const ADDRESS_TAIL: usize = 4;

/// Shorten a wallet address for display: `0x1234...abcd`.
/// Addresses too short to abbreviate are returned as-is.
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= ADDRESS_HEAD + ADDRESS_TAIL {
        return address.to_string();
    }
    let head: String = chars[..ADDRESS_HEAD].iter().collect();
    let tail: String = chars[chars.len() - ADDRESS_TAIL..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Format a timestamp to a more readable form
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%b %d, %Y %H:%M").to_string()
}

/// Format an ETH amount with four decimals
pub fn format_eth(amount: f64) -> String {
    format!("{:.4} ETH", amount)
}

/// Map link for a GPS fix
pub fn maps_url(latitude: f64, longitude: f64) -> String {
    format!("https://www.google.com/maps?q={},{}", latitude, longitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_shorten_address() {
        assert_eq!(
            shorten_address("0x1234567890abcdef1234567890abcdef12345678"),
            "0x1234...5678"
        );
        assert_eq!(shorten_address("0x12345678"), "0x12345678"); // Too short, return as-is
        assert_eq!(shorten_address(""), "");
        assert_eq!(shorten_address("0x123456789"), "0x1234...6789");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 5)
            .and_then(|d| d.and_hms_opt(14, 3, 0))
            .expect("valid date");
        assert_eq!(format_timestamp(&ts), "Jan 05, 2025 14:03");
    }

    #[test]
    fn test_format_eth() {
        assert_eq!(format_eth(0.5), "0.5000 ETH");
        assert_eq!(format_eth(1.23456), "1.2346 ETH");
    }

    #[test]
    fn test_maps_url() {
        assert_eq!(maps_url(40.7, -74.0), "https://www.google.com/maps?q=40.7,-74");
    }
}
