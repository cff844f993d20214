//! Inventory harvest over a session pool.
//!
//! One query on the controller session discovers the AP names; the detail
//! for each name is then fetched on a pool of separate sessions, one task
//! per AP, and reassembled in discovery order.

use std::sync::Arc;

use log::{debug, error, warn};
use tokio::task::JoinHandle;

use crate::config::ControllerConfig;
use crate::error::WlcError;
use crate::model::AccessPoint;
use crate::parse;
use crate::pool::SessionPool;
use crate::session::{DeviceSession, SessionFactory};
use crate::templates;

/// Discovers every AP on the controller and fetches its identity detail.
///
/// `session` is the controller's own session. It is disconnected while the
/// pool runs (controllers cap concurrent CLI logins) and reconnected before
/// returning, whatever the outcome of the pool.
pub async fn harvest<F>(
    session: &mut F::Session,
    factory: &Arc<F>,
    config: &ControllerConfig,
) -> Result<Vec<AccessPoint>, WlcError>
where
    F: SessionFactory,
{
    let inventory = session.send_command(templates::INVENTORY_ALL).await?;
    let names = parse::parse_inventory_names(&inventory);
    debug!("discovered {} access points", names.len());

    session.disconnect().await;

    let result = fetch_details(factory.as_ref(), names, config).await;

    if let Err(e) = session.connect(config.connect_retries).await {
        warn!("controller session reconnect failed: {e}");
    }
    result
}

async fn fetch_details<F>(
    factory: &F,
    names: Vec<String>,
    config: &ControllerConfig,
) -> Result<Vec<AccessPoint>, WlcError>
where
    F: SessionFactory,
{
    let pool = match SessionPool::connect(factory, config.pool_size, config.connect_retries).await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("session pool unavailable, harvest aborted: {e}");
            return Err(e);
        }
    };

    let handles: Vec<(String, JoinHandle<AccessPoint>)> = names
        .into_iter()
        .map(|name| {
            let pool = Arc::clone(&pool);
            let task_name = name.clone();
            (name, tokio::spawn(fetch_one(pool, task_name)))
        })
        .collect();

    let mut access_points = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        match handle.await {
            Ok(ap) => access_points.push(ap),
            Err(e) => {
                warn!("detail task for {name} failed: {e}");
                access_points.push(AccessPoint::named(name));
            }
        }
    }

    pool.shutdown().await;
    Ok(access_points)
}

async fn fetch_one<S: DeviceSession>(pool: Arc<SessionPool<S>>, name: String) -> AccessPoint {
    let mut slot = match pool.acquire().await {
        Ok(slot) => slot,
        Err(e) => {
            warn!("no session for {name}: {e}");
            return AccessPoint::named(name);
        }
    };

    let output = slot.send_command(&templates::ap_config_general(&name)).await;
    drop(slot);

    match output {
        Ok(out) => {
            let detail = parse::parse_ap_detail(&out);
            if detail.is_detail_empty() {
                warn!("no detail fields found for {name}");
            }
            AccessPoint { name, ..detail }
        }
        Err(e) if e.is_command_failure() => {
            warn!("detail fetch for {name} failed: {e}");
            AccessPoint::named(name)
        }
        Err(e) => {
            error!("session error while fetching {name}: {e}");
            AccessPoint::named(name)
        }
    }
}
