//! Parsers for the text the Windows inventory and network tools print.
//!
//! Kept free of `cfg(windows)` so they can be tested anywhere.

use super::{InventoryRecord, LiveInterface};

/// Parse `wmic ... get /format:list` output: `Key=Value` lines, records
/// separated by blank lines.
pub fn parse_list_output(output: &str) -> Vec<InventoryRecord> {
    let mut records = Vec::new();
    let mut current = InventoryRecord::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            current.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    if !current.is_empty() {
        records.push(current);
    }
    records
}

/// Parse `getmac /v /fo csv /nh` output.
///
/// Columns: connection name, adapter description, physical address, transport.
/// Disconnected adapters report their transport as `Media disconnected`.
pub fn parse_getmac_csv(output: &str) -> Vec<LiveInterface> {
    output
        .lines()
        .filter_map(|line| {
            let cols = split_csv_line(line);
            if cols.len() < 4 {
                return None;
            }
            let address = normalize_address(&cols[2]);
            let status = if cols[3].to_ascii_lowercase().contains("disconnected") {
                "Disconnected"
            } else if cols[3].to_ascii_lowercase().contains("disabled") {
                "Disabled"
            } else {
                "Up"
            };
            Some(LiveInterface {
                name: cols[0].clone(),
                description: cols[1].clone(),
                address,
                status: status.to_string(),
            })
        })
        .collect()
}

fn normalize_address(raw: &str) -> Option<String> {
    let digits: String =
        raw.chars().filter(|c| c.is_ascii_hexdigit()).collect::<String>().to_ascii_uppercase();
    (digits.len() == 12).then_some(digits)
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut cols = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    for c in line.trim().chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => cols.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    if !line.trim().is_empty() {
        cols.push(field);
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_output_splits_records() {
        let out = "\r\n\r\nManufacturer=Dell Inc.\r\nSerialNumber=ABC123\r\n\r\n\r\nManufacturer=LENOVO\r\nSerialNumber=\r\n\r\n";
        let records = parse_list_output(out);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Manufacturer"], "Dell Inc.");
        assert_eq!(records[1]["SerialNumber"], "");
    }

    #[test]
    fn getmac_csv_parses_addresses_and_status() {
        let out = "\"Ethernet\",\"Intel(R) Ethernet Connection I219-V\",\"3C-7C-3F-1A-2B-4C\",\"\\Device\\Tcpip_{ABC}\"\r\n\"Wi-Fi\",\"Intel(R) Wi-Fi 6 AX201\",\"N/A\",\"Media disconnected\"\r\n";
        let interfaces = parse_getmac_csv(out);
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[0].address.as_deref(), Some("3C7C3F1A2B4C"));
        assert_eq!(interfaces[0].status, "Up");
        assert_eq!(interfaces[1].address, None);
        assert_eq!(interfaces[1].status, "Disconnected");
    }
}
