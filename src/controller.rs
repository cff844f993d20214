//! The controller facade.

use std::sync::Arc;

use log::debug;

use crate::config::ControllerConfig;
use crate::error::WlcError;
use crate::harvest;
use crate::model::{AccessPoint, CdpNeighbor, EthernetInterfaceStat, LanPort};
use crate::parse;
use crate::session::{DeviceSession, SessionFactory, SshSessionFactory};
use crate::templates;

/// One wireless LAN controller reached through CLI sessions.
///
/// Owns the controller's own session, used for single-AP queries and
/// mutations, and the factory that builds pool sessions for a harvest.
pub struct Controller<F: SessionFactory> {
    config: ControllerConfig,
    factory: Arc<F>,
    session: F::Session,
}

impl Controller<SshSessionFactory> {
    /// Controller over SSH. Nothing is connected yet.
    pub fn ssh(config: ControllerConfig) -> Result<Self, WlcError> {
        let factory = SshSessionFactory::new(config.clone())?;
        Self::new(config, factory)
    }
}

impl<F: SessionFactory> Controller<F> {
    pub fn new(config: ControllerConfig, factory: F) -> Result<Self, WlcError> {
        config.validate()?;
        let session = factory.create();
        Ok(Self {
            config,
            factory: Arc::new(factory),
            session,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn session(&self) -> &F::Session {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut F::Session {
        &mut self.session
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Connects the controller session, retrying up to the configured bound.
    pub async fn connect(&mut self) -> Result<(), WlcError> {
        self.session.connect(self.config.connect_retries).await?;
        debug!("connected to {}", self.config.device_addr());
        Ok(())
    }

    /// Logs out and closes the controller session.
    pub async fn logout(&mut self) {
        self.session.disconnect().await;
    }

    /// Every AP on the controller with its MAC, model, serial and group.
    ///
    /// See [`harvest::harvest`] for how the work is spread over the pool.
    pub async fn harvest_inventory(&mut self) -> Result<Vec<AccessPoint>, WlcError> {
        harvest::harvest(&mut self.session, &self.factory, &self.config).await
    }

    /// Identity detail of one AP by name.
    pub async fn get_ap(&mut self, ap_name: &str) -> Result<AccessPoint, WlcError> {
        let out = self
            .session
            .send_command(&templates::ap_config_general(ap_name))
            .await?;
        let detail = parse::parse_ap_detail(&out);
        if detail.name.is_empty() && !detail.is_detail_empty() {
            return Ok(AccessPoint {
                name: ap_name.to_string(),
                ..detail
            });
        }
        Ok(detail)
    }

    pub async fn get_cdp_neighbor(&mut self, ap_name: &str) -> Result<CdpNeighbor, WlcError> {
        let out = self
            .session
            .send_command(&templates::ap_cdp_neighbors(ap_name))
            .await?;
        Ok(parse::parse_cdp_neighbor(&out))
    }

    pub async fn get_ethernet_stats(
        &mut self,
        ap_name: &str,
    ) -> Result<EthernetInterfaceStat, WlcError> {
        let out = self
            .session
            .send_command(&templates::ap_stats_ethernet(ap_name))
            .await?;
        Ok(parse::parse_ethernet_stats(&out))
    }

    pub async fn get_lan_ports(&mut self, ap_name: &str) -> Result<Vec<LanPort>, WlcError> {
        let out = self
            .session
            .send_command(&templates::ap_lan_port_summary(ap_name))
            .await?;
        Ok(parse::parse_lan_ports(&out))
    }
}
