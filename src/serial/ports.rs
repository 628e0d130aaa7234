//! Serial port discovery for the CLI `scan` action and the kiosk's port picker.

use serde::Serialize;

use super::SerialError;

/// Name prefixes of USB serial adapters the boards show up as
const DEVICE_PREFIXES: [&str; 4] = [
    "/dev/ttyUSB",
    "/dev/ttyACM",
    "/dev/cu.usbserial",
    "/dev/cu.usbmodem",
];

/// A serial port that could host an ESP32 or GIGA
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: String,
    pub product: Option<String>,
}

/// Whether a port name looks like a board rather than a built-in UART
pub fn is_device_port(name: &str) -> bool {
    if DEVICE_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        return true;
    }
    cfg!(target_os = "windows") && name.starts_with("COM")
}

/// List candidate board ports, sorted by name
pub fn scan_ports() -> Result<Vec<PortInfo>, SerialError> {
    let ports = serialport::available_ports().map_err(SerialError::Enumerate)?;

    let mut found: Vec<PortInfo> = ports
        .into_iter()
        .filter(|p| is_device_port(&p.port_name))
        .map(|p| {
            let (port_type, product) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => ("USB".to_string(), info.product),
                serialport::SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None),
                serialport::SerialPortType::PciPort => ("PCI".to_string(), None),
                serialport::SerialPortType::Unknown => ("Unknown".to_string(), None),
            };
            PortInfo {
                port_name: p.port_name,
                port_type,
                product,
            }
        })
        .collect();

    found.sort_by(|a, b| a.port_name.cmp(&b.port_name));

    if found.is_empty() {
        log::warn!("No serial ports found");
    } else {
        let names: Vec<&str> = found.iter().map(|p| p.port_name.as_str()).collect();
        log::info!("Found ports: {}", names.join(", "));
    }

    Ok(found)
}

/// Port choices for a device picker: the configured port first, then every
/// scanned port not already listed
pub fn port_choices(configured: &str, scanned: &[PortInfo]) -> Vec<String> {
    let mut choices: Vec<String> = Vec::with_capacity(scanned.len() + 1);
    if !configured.is_empty() {
        choices.push(configured.to_string());
    }
    for port in scanned {
        if !choices.contains(&port.port_name) {
            choices.push(port.port_name.clone());
        }
    }
    choices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb(name: &str) -> PortInfo {
        PortInfo {
            port_name: name.to_string(),
            port_type: "USB".to_string(),
            product: Some("CP2102 USB to UART".to_string()),
        }
    }

    #[test]
    fn test_port_choices_configured_first() {
        let scanned = vec![usb("/dev/ttyACM0"), usb("/dev/ttyUSB0"), usb("/dev/ttyUSB1")];
        assert_eq!(
            port_choices("/dev/ttyUSB0", &scanned),
            vec!["/dev/ttyUSB0", "/dev/ttyACM0", "/dev/ttyUSB1"]
        );
    }

    #[test]
    fn test_port_choices_keeps_unplugged_configured_port() {
        assert_eq!(port_choices("/dev/ttyUSB3", &[]), vec!["/dev/ttyUSB3"]);
        assert!(port_choices("", &[]).is_empty());
    }

    #[test]
    fn test_port_info_json() {
        let json = serde_json::to_value(vec![usb("/dev/ttyUSB0")]).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "port_name": "/dev/ttyUSB0",
                "port_type": "USB",
                "product": "CP2102 USB to UART",
            }])
        );
    }

    #[test]
    fn test_device_port_filter() {
        assert!(is_device_port("/dev/ttyUSB0"));
        assert!(is_device_port("/dev/ttyACM1"));
        assert!(is_device_port("/dev/cu.usbserial-0001"));
        assert!(is_device_port("/dev/cu.usbmodem14101"));
        assert!(!is_device_port("/dev/ttyS0"));
        assert!(!is_device_port("/dev/tty.Bluetooth-Incoming-Port"));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_com_ports_ignored_off_windows() {
        assert!(!is_device_port("COM3"));
    }
}
