//! Screen-scrape parsers for controller command output.
//!
//! Each parser takes the raw text of one command category and extracts its
//! fields with literal anchors (a label, a dot leader or colon, then a value
//! token). Text is whitespace-normalized before matching so column alignment
//! does not matter. A missing primary anchor yields a zero-value record and
//! any other missing anchor yields an empty field; none of this is an error.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{AccessPoint, CdpNeighbor, EthernetInterfaceStat, LanPort, LanPortState};

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(err) => panic!("invalid parser regex {pattern:?}: {err}"),
    }
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| compile(r"\s+"));

static INVENTORY_NAME: Lazy<Regex> = Lazy::new(|| compile(r"Inven\w+\sfor\s(\S+)"));

static AP_NAME: Lazy<Regex> = Lazy::new(|| compile(r"Cisco\sAP\sName[.]+\s(\S+)"));
static MAC_ADDRESS: Lazy<Regex> = Lazy::new(|| compile(r"MAC\sAddress[.]+\s(\S+)"));
static AP_GROUP: Lazy<Regex> = Lazy::new(|| compile(r"AP\sGroup\sName[.]+\s(\S+)"));
static SERIAL: Lazy<Regex> = Lazy::new(|| compile(r"Serial\sNumber[.]+\s(\S+)"));
static AP_MODEL: Lazy<Regex> = Lazy::new(|| compile(r"AP\sModel[.]+\s(\S+)"));

static CDP_AP_NAME: Lazy<Regex> = Lazy::new(|| compile(r"AP\sName:\s?(\S+)"));
static CDP_LOCAL_INTF: Lazy<Regex> = Lazy::new(|| compile(r"Interface:\s(\w+)"));
static CDP_DEVICE_ID: Lazy<Regex> = Lazy::new(|| compile(r"Device\sID:\s(\S+)"));
static CDP_REMOTE_INTF: Lazy<Regex> = Lazy::new(|| compile(r"outgoing\sport\):\s(\S+)"));
static CDP_REMOTE_IP: Lazy<Regex> =
    Lazy::new(|| compile(r"Entry\saddress\(es\):\s(?:IP(?:v4)?\saddress:\s)?(\S+)"));

static ETH_NAME: Lazy<Regex> = Lazy::new(|| compile(r"Interface\sname[.]+\s(\S+)"));
static ETH_STATUS: Lazy<Regex> = Lazy::new(|| compile(r"Status[.]+\s(\S+)"));
static ETH_SPEED: Lazy<Regex> = Lazy::new(|| compile(r"Speed[.]+\s(\S+)"));
static ETH_DUPLEX: Lazy<Regex> = Lazy::new(|| compile(r"Duplex[.]+\s(\S+)"));
static ETH_TX_BYTES: Lazy<Regex> = Lazy::new(|| compile(r"Tx\sBytes[.]+\s(\S+)"));
static ETH_RX_BYTES: Lazy<Regex> = Lazy::new(|| compile(r"Rx\sBytes[.]+\s(\S+)"));
static ETH_DROPS: Lazy<Regex> = Lazy::new(|| compile(r"Drops[.]+\s(\S+)"));

static LAN_PORT: Lazy<Regex> = Lazy::new(|| compile(r"^lan(\d+)$"));

static FACTORY_RESET_DONE: Lazy<Regex> = Lazy::new(|| compile(r"All\sAP\sconfiguration.*"));

/// Collapses every run of whitespace (newlines and tabs included) into a
/// single space.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn capture_owned(re: &Regex, text: &str) -> String {
    capture(re, text).map(str::to_string).unwrap_or_default()
}

/// Joins two counters as `first/second`. Empty unless both are present.
pub fn join_counters(first: Option<&str>, second: Option<&str>) -> String {
    match (first, second) {
        (Some(a), Some(b)) => format!("{a}/{b}"),
        _ => String::new(),
    }
}

/// Splits a `first/second` pair produced by [`join_counters`].
pub fn split_counters(joined: &str) -> Option<(&str, &str)> {
    joined.split_once('/')
}

/// AP names from `show ap inventory all`, in listing order, without
/// duplicates.
pub fn parse_inventory_names(out: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    out.lines()
        .filter_map(|line| {
            let line = normalize_whitespace(line);
            capture(&INVENTORY_NAME, &line).map(str::to_string)
        })
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Identity fields from `show ap config general <ap>`.
///
/// Every field is independent. The name comes from the `Cisco AP Name`
/// anchor when present; callers that already know the name override it.
pub fn parse_ap_detail(out: &str) -> AccessPoint {
    let text = normalize_whitespace(out);
    AccessPoint {
        name: capture_owned(&AP_NAME, &text),
        mac_address: capture_owned(&MAC_ADDRESS, &text),
        model: capture_owned(&AP_MODEL, &text),
        serial: capture_owned(&SERIAL, &text),
        group: capture_owned(&AP_GROUP, &text),
    }
}

/// Neighbor from `show ap cdp neighbors detail <ap>`.
///
/// Without an `AP Name:` line the AP has no wired neighbor and the record is
/// empty.
pub fn parse_cdp_neighbor(out: &str) -> CdpNeighbor {
    let text = normalize_whitespace(out);
    if !CDP_AP_NAME.is_match(&text) {
        return CdpNeighbor::default();
    }
    CdpNeighbor {
        local_interface: capture_owned(&CDP_LOCAL_INTF, &text),
        remote_device_name: capture_owned(&CDP_DEVICE_ID, &text),
        remote_interface: capture_owned(&CDP_REMOTE_INTF, &text),
        remote_device_ip_address: capture_owned(&CDP_REMOTE_IP, &text),
    }
}

/// Uplink counters from `show ap stats ethernet <ap>`.
pub fn parse_ethernet_stats(out: &str) -> EthernetInterfaceStat {
    let text = normalize_whitespace(out);
    let Some(name) = capture(&ETH_NAME, &text) else {
        return EthernetInterfaceStat::default();
    };

    let speed_and_duplex = [capture(&ETH_SPEED, &text), capture(&ETH_DUPLEX, &text)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    EthernetInterfaceStat {
        name: name.to_string(),
        status: capture_owned(&ETH_STATUS, &text),
        speed_and_duplex,
        tx_rx_byte_counts: join_counters(
            capture(&ETH_TX_BYTES, &text),
            capture(&ETH_RX_BYTES, &text),
        ),
        drops: capture_owned(&ETH_DROPS, &text),
    }
}

/// LAN ports from `show ap lan port-summary <ap>`.
///
/// A port line starts with `lanN`. The next token is the state when it reads
/// `enabled` or `disabled`; the VLAN is the first integer after the port
/// token (0 when absent), whether or not a state was printed.
pub fn parse_lan_ports(out: &str) -> Vec<LanPort> {
    out.lines()
        .filter_map(|line| {
            let line = normalize_whitespace(line).to_ascii_lowercase();
            let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
            let port_pos = tokens.iter().position(|t| LAN_PORT.is_match(t))?;
            let port_id = capture(&LAN_PORT, tokens[port_pos])?.parse::<u8>().ok()?;
            let state = tokens
                .get(port_pos + 1)
                .and_then(|t| LanPortState::from_summary_token(t));
            let vlan_id = tokens
                .iter()
                .skip(port_pos + 1)
                .find_map(|t| t.parse::<u16>().ok())
                .unwrap_or(0);
            Some(LanPort {
                port_id,
                state,
                vlan_id,
            })
        })
        .collect()
}

/// The `All AP configuration ...` line printed by `clear ap config <ap>`, or
/// an empty string when the controller did not confirm.
pub fn parse_factory_reset(out: &str) -> String {
    out.lines()
        .find_map(|line| {
            let line = normalize_whitespace(line);
            FACTORY_RESET_DONE
                .find(&line)
                .map(|m| m.as_str().trim_end().to_string())
        })
        .unwrap_or_default()
}
