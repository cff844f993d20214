//! Controller CLI template and command builders.
//!
//! [`aireos`] returns the prompt state machine for the controller shell.
//! The remaining functions build the exact command strings the harvester,
//! single-AP queries and mutations send.

use std::collections::HashMap;

use crate::device::{DeviceHandler, Input};
use crate::error::WlcError;
use crate::model::LanPortState;

/// Dynamic parameter key for the in-shell `User:` prompt.
pub const USERNAME_PARAM: &str = "Username";
/// Dynamic parameter key for the in-shell `Password:` prompt.
pub const PASSWORD_PARAM: &str = "Password";

/// Answer sent to confirmation questions.
pub const CONFIRM: &str = "y";
pub const LOGOUT: &str = "logout";
pub const PAGING_DISABLE: &str = "config paging disable";
pub const SAVE_CONFIG: &str = "save config";
pub const INVENTORY_ALL: &str = "show ap inventory all";

/// Returns a `DeviceHandler` for the wireless controller CLI.
///
/// The controller asks for credentials a second time inside the shell, so
/// `User:` and `Password:` are answered from dynamic parameters. Yes/no
/// questions count as prompts: the command returns and the caller decides
/// whether to confirm.
pub fn aireos() -> Result<DeviceHandler, WlcError> {
    DeviceHandler::new(
        // Prompt
        vec![
            ("Exec".to_string(), vec![r"^\([^)]+\)\s*\S*>\s*$"]),
            ("Confirm".to_string(), vec![r"(?i).*\(y/n\)\s*[:?]?\s*$"]),
        ],
        // Write (interactive inputs)
        vec![
            (
                "User".to_string(),
                Input::dynamic(USERNAME_PARAM),
                vec![r"^\x00*\r?User:\s*$"],
            ),
            (
                "Password".to_string(),
                Input::dynamic(PASSWORD_PARAM),
                vec![r"^\x00*\r?Password:\s*$"],
            ),
        ],
        // More regex
        vec![r"--More--"],
        // Error regex
        vec![
            r"^Incorrect usage",
            r"^Incorrect input",
            r"^Invalid .+",
            r"^Error[:\s].*",
            r"^Request failed.*",
            r"^Unknown (command|AP).*",
        ],
        // Ignore errors
        vec![r"^Error: Nothing to save"],
        HashMap::new(),
    )
}

/// Detail block for one AP (`Cisco AP Name`, `MAC Address`, ...).
pub fn ap_config_general(ap_name: &str) -> String {
    format!("show ap config general {ap_name}")
}

pub fn ap_cdp_neighbors(ap_name: &str) -> String {
    format!("show ap cdp neighbors detail {ap_name}")
}

pub fn ap_stats_ethernet(ap_name: &str) -> String {
    format!("show ap stats ethernet {ap_name}")
}

pub fn ap_lan_port_summary(ap_name: &str) -> String {
    format!("show ap lan port-summary {ap_name}")
}

/// `target` may be the current AP name, its MAC address or its serial.
pub fn ap_rename(new_name: &str, target: &str) -> String {
    format!("config ap name {new_name} {target}")
}

pub fn ap_group(group_name: &str, ap_name: &str) -> String {
    format!("config ap group-name {group_name} {ap_name}")
}

pub fn ap_reset(ap_name: &str) -> String {
    format!("config ap reset {ap_name}")
}

pub fn ap_clear_config(ap_name: &str) -> String {
    format!("clear ap config {ap_name}")
}

pub fn ap_lan_port_state(ap_name: &str, port_id: u8, state: LanPortState) -> String {
    format!("config ap lan port-id {port_id} {} {ap_name}", state.as_str())
}

pub fn ap_lan_port_vlan(ap_name: &str, port_id: u8, vlan_id: u16) -> String {
    format!("config ap lan enable access vlan {vlan_id} {port_id} {ap_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aireos_template_builds() {
        let handler = aireos().expect("template should build");
        assert!(handler.states().contains(&"confirm".to_string()));
    }

    #[test]
    fn aireos_recognises_controller_prompts() {
        let handler = aireos().expect("template");

        assert!(handler.read_prompt("(Cisco Controller) >"));
        assert!(handler.read_prompt("(wlc-core-01) >"));
        assert!(handler.read_prompt("(Cisco Controller) config>"));
        assert!(handler.read_prompt(
            "Are you sure you want to save? (y/n) "
        ));
        assert!(handler.read_prompt(
            "Would you like to save them now? (y/N)"
        ));
        assert!(!handler.read_prompt("AP Group Name.................... default-group"));
    }

    #[test]
    fn aireos_answers_login_prompts_from_params() {
        let mut handler = aireos().expect("template");
        handler
            .dyn_param
            .insert(USERNAME_PARAM.to_string(), "admin\n".to_string());
        handler
            .dyn_param
            .insert(PASSWORD_PARAM.to_string(), "secret\n".to_string());

        assert_eq!(
            handler.read_need_write("User:").map(|(v, _)| v),
            Some("admin\n".to_string())
        );
        assert_eq!(
            handler.read_need_write("Password:").map(|(v, _)| v),
            Some("secret\n".to_string())
        );
        assert_eq!(
            handler.read_need_write("--More-- or (q)uit").map(|(v, _)| v),
            Some(" ".to_string())
        );
    }

    #[test]
    fn aireos_flags_rejected_commands() {
        let mut handler = aireos().expect("template");
        handler.read("Incorrect usage. Use the '?' or <TAB> key to list commands.");
        assert!(handler.error());

        handler.reset();
        handler.read("Error: Nothing to save");
        assert!(!handler.error());
    }

    #[test]
    fn command_builders_match_controller_syntax() {
        assert_eq!(ap_config_general("ap1"), "show ap config general ap1");
        assert_eq!(ap_rename("new", "f0:b2:e5:c2:39:98"), "config ap name new f0:b2:e5:c2:39:98");
        assert_eq!(ap_group("lobby", "ap1"), "config ap group-name lobby ap1");
        assert_eq!(
            ap_lan_port_state("ap1", 2, LanPortState::Disable),
            "config ap lan port-id 2 disable ap1"
        );
        assert_eq!(
            ap_lan_port_vlan("ap1", 1, 20),
            "config ap lan enable access vlan 20 1 ap1"
        );
    }
}
