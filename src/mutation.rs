//! Single-shot configuration changes on the controller session.
//!
//! Every mutation is one config line set: the command built from a template,
//! an optional `y` confirmation line, then a settle pause. The controller gives no signal that
//! a change has been applied, so the pause runs even when the command fails.

use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::controller::Controller;
use crate::error::WlcError;
use crate::model::LanPortState;
use crate::parse;
use crate::session::{DeviceSession, SessionFactory};
use crate::templates;

/// The configuration changes the controller accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Rename,
    SetGroup,
    Reboot,
    FactoryReset,
    SetLanPortState,
    SetLanPortVlan,
    SaveConfig,
}

impl<F: SessionFactory> Controller<F> {
    async fn mutate(&mut self, kind: MutationKind, command: &str) -> Result<String, WlcError> {
        debug!("{kind:?}: {command}");
        let result = self.send_mutation(kind, command).await;
        tokio::time::sleep(self.config().settle_delay()).await;
        result
    }

    async fn send_mutation(&mut self, kind: MutationKind, command: &str) -> Result<String, WlcError> {
        let mut lines = vec![command.to_string()];
        if self.config().needs_confirmation(kind) {
            lines.push(templates::CONFIRM.to_string());
        }
        let output = self.session_mut().send_config_lines(&lines).await?;
        Ok(output.trim_end_matches('\n').to_string())
    }

    /// Renames an AP. `target` is its current name, MAC address or serial.
    pub async fn set_ap_name(&mut self, new_name: &str, target: &str) -> Result<(), WlcError> {
        self.mutate(MutationKind::Rename, &templates::ap_rename(new_name, target))
            .await
            .map(|_| ())
    }

    pub async fn set_ap_group(&mut self, group_name: &str, ap_name: &str) -> Result<(), WlcError> {
        self.mutate(MutationKind::SetGroup, &templates::ap_group(group_name, ap_name))
            .await
            .map(|_| ())
    }

    /// Reboots an AP and returns the controller's raw response.
    pub async fn reboot_ap(&mut self, ap_name: &str) -> Result<String, WlcError> {
        self.mutate(MutationKind::Reboot, &templates::ap_reset(ap_name))
            .await
    }

    /// Clears an AP's configuration. Returns the controller's
    /// `All AP configuration ...` line, or an empty string when it printed
    /// none.
    pub async fn factory_reset_ap(&mut self, ap_name: &str) -> Result<String, WlcError> {
        let output = self
            .mutate(MutationKind::FactoryReset, &templates::ap_clear_config(ap_name))
            .await?;
        Ok(parse::parse_factory_reset(&output))
    }

    pub async fn set_ap_lan_port_state(
        &mut self,
        ap_name: &str,
        port_id: u8,
        state: LanPortState,
    ) -> Result<(), WlcError> {
        self.mutate(
            MutationKind::SetLanPortState,
            &templates::ap_lan_port_state(ap_name, port_id, state),
        )
        .await
        .map(|_| ())
    }

    pub async fn set_ap_lan_port_vlan(
        &mut self,
        ap_name: &str,
        port_id: u8,
        vlan_id: u16,
    ) -> Result<(), WlcError> {
        self.mutate(
            MutationKind::SetLanPortVlan,
            &templates::ap_lan_port_vlan(ap_name, port_id, vlan_id),
        )
        .await
        .map(|_| ())
    }

    /// Persists the running configuration.
    pub async fn save_config(&mut self) -> Result<(), WlcError> {
        self.mutate(MutationKind::SaveConfig, templates::SAVE_CONFIG)
            .await
            .map(|_| ())
    }
}
