//! WiFi station bring-up and SNTP time sync.
//!
//! Boot-time collaborator: associate with the configured AP, then block
//! until SNTP has set the wall clock, because session deadlines and the
//! START/STOP stamps are epoch-based. The handles are kept alive for
//! the life of the process; there is no reconnect state machine here —
//! the IDF station driver re-associates on its own and the MQTT layer
//! already retries through outages.

use core::fmt;

use log::info;

use crate::config::NetworkConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetSetupError {
    InvalidSsid,
    InvalidPsk,
    WifiFailed,
    SntpFailed,
}

impl fmt::Display for NetSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPsk => write!(f, "PSK invalid (must be 8-64 bytes, or empty for open)"),
            Self::WifiFailed => write!(f, "WiFi association failed"),
            Self::SntpFailed => write!(f, "SNTP synchronization failed"),
        }
    }
}

impl std::error::Error for NetSetupError {}

// ── Credential validation ─────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), NetSetupError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(NetSetupError::InvalidSsid);
    }
    Ok(())
}

fn validate_psk(psk: &str) -> Result<(), NetSetupError> {
    if psk.is_empty() {
        return Ok(());
    }
    if psk.len() < 8 || psk.len() > 64 {
        return Err(NetSetupError::InvalidPsk);
    }
    Ok(())
}

// ── ESP-IDF bring-up ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct NetStack {
    _wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    _sntp: esp_idf_svc::sntp::EspSntp<'static>,
}

/// Associate, obtain an IP, then wait for SNTP. Blocks until the clock
/// is set; a device that cannot reach an NTP server would stamp every
/// session with a bogus epoch, so boot does not proceed without one.
#[cfg(target_os = "espidf")]
pub fn bring_up(
    cfg: &NetworkConfig,
    ntp_server: &str,
    modem: esp_idf_svc::hal::modem::Modem,
    sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
) -> Result<NetStack, NetSetupError> {
    use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};
    use esp_idf_svc::wifi::{
        AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
    };

    validate_ssid(&cfg.ssid)?;
    validate_psk(&cfg.psk)?;

    let esp_wifi =
        EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(|_| NetSetupError::WifiFailed)?;
    let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop).map_err(|_| NetSetupError::WifiFailed)?;

    let auth_method = if cfg.psk.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    let client_cfg = ClientConfiguration {
        ssid: cfg.ssid.as_str().try_into().map_err(|_| NetSetupError::InvalidSsid)?,
        password: cfg.psk.as_str().try_into().map_err(|_| NetSetupError::InvalidPsk)?,
        auth_method,
        ..Default::default()
    };
    wifi.set_configuration(&Configuration::Client(client_cfg))
        .map_err(|_| NetSetupError::WifiFailed)?;

    info!("WiFi: connecting to '{}'", cfg.ssid);
    wifi.start().map_err(|_| NetSetupError::WifiFailed)?;
    wifi.connect().map_err(|_| NetSetupError::WifiFailed)?;
    wifi.wait_netif_up().map_err(|_| NetSetupError::WifiFailed)?;
    info!("WiFi: associated, netif up");

    let mut sntp_conf = SntpConf::default();
    sntp_conf.servers = [ntp_server];
    let sntp = EspSntp::new(&sntp_conf).map_err(|_| NetSetupError::SntpFailed)?;
    info!("SNTP: waiting for sync from {ntp_server}");
    while sntp.get_sync_status() != SyncStatus::Completed {
        std::thread::sleep(std::time::Duration::from_millis(250));
    }
    info!("SNTP: clock synchronized");

    Ok(NetStack {
        _wifi: wifi,
        _sntp: sntp,
    })
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct NetStack;

#[cfg(not(target_os = "espidf"))]
pub fn bring_up(cfg: &NetworkConfig, ntp_server: &str) -> Result<NetStack, NetSetupError> {
    validate_ssid(&cfg.ssid)?;
    validate_psk(&cfg.psk)?;
    info!("WiFi(sim): associated with '{}'", cfg.ssid);
    info!("SNTP(sim): clock assumed synchronized ({ntp_server})");
    Ok(NetStack)
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    fn net(ssid: &str, psk: &str) -> NetworkConfig {
        NetworkConfig {
            ssid: ssid.into(),
            psk: psk.into(),
        }
    }

    #[test]
    fn rejects_empty_ssid() {
        assert_eq!(
            bring_up(&net("", "password123"), "pool.ntp.org").err(),
            Some(NetSetupError::InvalidSsid)
        );
    }

    #[test]
    fn rejects_overlong_ssid() {
        let ssid = "x".repeat(33);
        assert_eq!(
            bring_up(&net(&ssid, "password123"), "pool.ntp.org").err(),
            Some(NetSetupError::InvalidSsid)
        );
    }

    #[test]
    fn rejects_short_psk() {
        assert_eq!(
            bring_up(&net("shopfloor", "short"), "pool.ntp.org").err(),
            Some(NetSetupError::InvalidPsk)
        );
    }

    #[test]
    fn accepts_open_network() {
        assert!(bring_up(&net("shopfloor", ""), "pool.ntp.org").is_ok());
    }

    #[test]
    fn accepts_wpa2() {
        assert!(bring_up(&net("shopfloor", "secret123"), "pool.ntp.org").is_ok());
    }
}
