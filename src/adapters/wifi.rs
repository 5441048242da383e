//! Wi-Fi station bring-up.
//!
//! Credentials are baked in at build time (`WIFI_SSID` / `WIFI_PASS`
//! environment variables) and validated before the driver is touched.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` in station mode;
//!   blocks until the netif is up.
//! - **all other targets**: only credential validation exists.

use core::fmt;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};
#[cfg(target_os = "espidf")]
use log::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
        }
    }
}

impl std::error::Error for ConnectivityError {}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        if ssid.is_empty() || !is_printable_ascii(ssid) {
            return Err(ConnectivityError::InvalidSsid);
        }
        if !password.is_empty() && password.len() < 8 {
            return Err(ConnectivityError::InvalidPassword);
        }
        Ok(Self {
            ssid: ssid.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: password
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
        })
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

/// Start the station and block until it has an IP.
#[cfg(target_os = "espidf")]
pub fn connect_station(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    creds: &WifiCredentials,
) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: creds.ssid.clone(),
        password: creds.password.clone(),
        auth_method: if creds.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;

    wifi.start()?;
    info!("WiFi: connecting to '{}'", creds.ssid);
    wifi.connect()?;
    wifi.wait_netif_up()?;

    let ip = wifi.wifi().sta_netif().get_ip_info()?;
    info!("WiFi: connected, ip {}", ip.ip);
    Ok(wifi)
}
