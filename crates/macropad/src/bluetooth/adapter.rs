//! BlueZ adapter binding
//!
//! Talks to `org.bluez.Adapter1` and `org.bluez.ProfileManager1` over the
//! system bus. Everything the engine needs from BlueZ goes through the
//! [`AdapterClient`] trait so tests can substitute a fake adapter.

use hidp::{HidError, Result, HID_PROFILE_UUID, PSM_HID_CONTROL};
use std::collections::HashMap;
use tracing::{debug, info};
use zbus::zvariant::Value;

/// Lifecycle of the adapter binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterState {
    /// No bus connection attempted yet
    Uninitialized,
    /// Adapter found and powered
    Bound,
    /// HID profile registered with BlueZ
    ProfileRegistered,
    /// Discoverable and accepting connections
    Ready,
    /// Initialization failed; message describes the cause
    Error(String),
}

/// Adapter operations the HID engine depends on
#[allow(async_fn_in_trait)]
pub trait AdapterClient {
    /// Power the adapter on; fails with [`HidError::AdapterUnavailable`]
    /// when no adapter is present on the bus
    async fn power_on(&self) -> Result<()>;

    /// Set the adapter alias (the name shown to pairing hosts)
    async fn set_alias(&self, name: &str) -> Result<()>;

    /// Toggle discoverable and pairable together
    async fn set_discoverable(&self, on: bool) -> Result<()>;

    /// Register the HID service record and our Profile1 object
    async fn register_service(&self, profile_path: &str, name: &str) -> Result<()>;
}

#[zbus::proxy(
    interface = "org.bluez.Adapter1",
    default_service = "org.bluez",
    default_path = "/org/bluez/hci0"
)]
trait Adapter1 {
    #[zbus(property)]
    fn powered(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn set_powered(&self, value: bool) -> zbus::Result<()>;

    #[zbus(property)]
    fn alias(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn set_alias(&self, value: &str) -> zbus::Result<()>;

    #[zbus(property)]
    fn discoverable(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn set_discoverable(&self, value: bool) -> zbus::Result<()>;

    #[zbus(property)]
    fn pairable(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn set_pairable(&self, value: bool) -> zbus::Result<()>;
}

#[zbus::proxy(
    interface = "org.bluez.ProfileManager1",
    default_service = "org.bluez",
    default_path = "/org/bluez"
)]
trait ProfileManager1 {
    fn register_profile(
        &self,
        profile: &zbus::zvariant::ObjectPath<'_>,
        uuid: &str,
        options: HashMap<&str, Value<'_>>,
    ) -> zbus::Result<()>;

    fn unregister_profile(&self, profile: &zbus::zvariant::ObjectPath<'_>) -> zbus::Result<()>;
}

/// The real BlueZ-backed implementation of [`AdapterClient`]
pub struct BluezAdapter {
    adapter: Adapter1Proxy<'static>,
    profile_manager: ProfileManager1Proxy<'static>,
}

impl BluezAdapter {
    /// Bind to the adapter at `adapter_path` (e.g. `/org/bluez/hci0`)
    pub async fn new(conn: &zbus::Connection, adapter_path: &str) -> Result<Self> {
        let adapter = Adapter1Proxy::builder(conn)
            .path(adapter_path.to_owned())
            .map_err(|e| HidError::Bus(e.to_string()))?
            .build()
            .await
            .map_err(|e| HidError::Bus(e.to_string()))?;
        let profile_manager = ProfileManager1Proxy::new(conn)
            .await
            .map_err(|e| HidError::Bus(e.to_string()))?;
        Ok(Self {
            adapter,
            profile_manager,
        })
    }
}

impl AdapterClient for BluezAdapter {
    async fn power_on(&self) -> Result<()> {
        // A missing adapter surfaces here as UnknownObject on the first
        // property access.
        self.adapter
            .set_powered(true)
            .await
            .map_err(|_| HidError::AdapterUnavailable)?;
        debug!("adapter powered on");
        Ok(())
    }

    async fn set_alias(&self, name: &str) -> Result<()> {
        self.adapter
            .set_alias(name)
            .await
            .map_err(|e| HidError::Bus(e.to_string()))?;
        debug!(alias = name, "adapter alias set");
        Ok(())
    }

    async fn set_discoverable(&self, on: bool) -> Result<()> {
        self.adapter
            .set_discoverable(on)
            .await
            .map_err(|e| HidError::Bus(e.to_string()))?;
        self.adapter
            .set_pairable(on)
            .await
            .map_err(|e| HidError::Bus(e.to_string()))?;
        debug!(discoverable = on, "adapter discoverable/pairable set");
        Ok(())
    }

    async fn register_service(&self, profile_path: &str, name: &str) -> Result<()> {
        let record = hidp::service_record_xml(name);
        let mut options: HashMap<&str, Value<'_>> = HashMap::new();
        options.insert("Name", Value::from(name.to_owned()));
        options.insert("Role", Value::from("server"));
        options.insert("PSM", Value::from(PSM_HID_CONTROL));
        options.insert("RequireAuthentication", Value::from(false));
        options.insert("RequireAuthorization", Value::from(false));
        options.insert("AutoConnect", Value::from(true));
        options.insert("ServiceRecord", Value::from(record));

        let path = zbus::zvariant::ObjectPath::try_from(profile_path)
            .map_err(|e| HidError::ProfileRegistration(e.to_string()))?;
        self.profile_manager
            .register_profile(&path, HID_PROFILE_UUID, options)
            .await
            .map_err(|e| HidError::ProfileRegistration(e.to_string()))?;
        info!(uuid = HID_PROFILE_UUID, "HID profile registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_state_equality() {
        assert_eq!(AdapterState::Uninitialized, AdapterState::Uninitialized);
        assert_ne!(
            AdapterState::Ready,
            AdapterState::Error("no adapter".into())
        );
        let e = AdapterState::Error("boom".into());
        assert_eq!(e, AdapterState::Error("boom".into()));
    }
}
