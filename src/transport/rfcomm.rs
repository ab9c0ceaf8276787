//! # Linux RFCOMM Bridge
//!
//! [`SerialBridge`] over BlueZ: classic Bluetooth printers bound to
//! `/dev/rfcommN` TTYs, listed and connected with `bluetoothctl`.
//!
//! ## Setup Performed on Connect
//!
//! ```bash
//! # reuse an existing binding from /proc/net/rfcomm or `rfcomm -a`, else:
//! bluetoothctl connect 66:22:B1:0C:3A:10
//! l2ping -c 1 66:22:B1:0C:3A:10
//! rfcomm bind 0 66:22:B1:0C:3A:10 1      # needs root
//! ```
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode so binary data is transmitted
//! without modification:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL off
//! - **No software flow control**: IXON, IXOFF, IXANY off
//! - **No output processing**: OPOST off (no LF to CRLF)
//! - **8-bit characters**: CS8, no parity
//! - **Non-canonical, no echo**: ICANON, ECHO, ECHONL, ISIG, IEXTEN off
//!
//! Software flow control matters: `0x11`/`0x13` (XON/XOFF) occur in QR
//! payload bytes and length headers.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::serial::{BridgeLink, SerialBridge};
use super::{DeviceDescriptor, LinkSender, WriteCapabilities, WriteChannel, link_watch};
use crate::error::ConnectionError;

/// RFCOMM channel printers expose SPP on.
const SPP_CHANNEL: u8 = 1;

/// How often an open link checks that its TTY still exists.
const LINK_POLL: Duration = Duration::from_secs(2);

/// Pause after `bluetoothctl connect` and `rfcomm bind` for the link to settle.
const SETTLE: Duration = Duration::from_millis(500);

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse `bluetoothctl devices` output: `Device <MAC> <name>` per line.
pub fn parse_device_lines(output: &str) -> Vec<DeviceDescriptor> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device ")?;
            let (address, name) = rest.split_once(' ').unwrap_or((rest, ""));
            is_valid_mac(address).then(|| DeviceDescriptor::new(name.trim(), address))
        })
        .collect()
}

/// Find the `/dev/rfcommN` bound to `mac` in `rfcomm` listing output.
///
/// Lines look like `rfcomm0: 66:22:B1:0C:3A:10 channel 1 clean`.
fn rfcomm_device_in(listing: &str, mac: &str) -> Option<String> {
    let mac_upper = mac.to_uppercase();
    listing
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac_upper))
        .filter_map(|line| line.split(':').next())
        .map(|name| format!("/dev/{}", name.trim()))
        .find(|path| Path::new(path).exists())
}

async fn run(program: &str, args: &[&str]) -> Result<std::process::Output, ConnectionError> {
    debug!(program, ?args, "running");
    Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| ConnectionError::Backend(format!("Failed to run {program}: {e}")))
}

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Checks `/proc/net/rfcomm` and falls back to `rfcomm -a`.
pub async fn find_rfcomm_for_mac(mac: &str) -> Result<Option<String>, ConnectionError> {
    if let Ok(contents) = tokio::fs::read_to_string("/proc/net/rfcomm").await {
        if let Some(path) = rfcomm_device_in(&contents, mac) {
            return Ok(Some(path));
        }
    }

    let output = run("rfcomm", &["-a"]).await?;
    Ok(rfcomm_device_in(&String::from_utf8_lossy(&output.stdout), mac))
}

/// Connect, verify and bind `mac` to `/dev/rfcomm<index>`.
///
/// **Requires root privileges** for `rfcomm bind`.
pub async fn setup_rfcomm(mac: &str, index: u8) -> Result<String, ConnectionError> {
    let mac_upper = mac.to_uppercase();
    let device_path = format!("/dev/rfcomm{index}");

    // May fail when already connected; l2ping decides
    let output = run("bluetoothctl", &["connect", &mac_upper]).await?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.contains("Connection successful") || stdout.contains("already connected") {
        debug!(mac = %mac_upper, "bluetoothctl connected");
    } else {
        debug!(mac = %mac_upper, output = %stdout.trim(), "bluetoothctl connect did not confirm");
    }
    tokio::time::sleep(SETTLE).await;

    let output = run("l2ping", &["-c", "1", &mac_upper]).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConnectionError::DeviceUnreachable(format!(
            "{}: {}",
            mac_upper,
            stderr.trim()
        )));
    }

    let index = index.to_string();
    let channel = SPP_CHANNEL.to_string();
    let output = run("rfcomm", &["bind", &index, &mac_upper, &channel]).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConnectionError::Backend(format!(
            "rfcomm bind failed: {}",
            stderr.trim()
        )));
    }
    tokio::time::sleep(SETTLE).await;

    if !Path::new(&device_path).exists() {
        return Err(ConnectionError::Backend(format!(
            "Device {device_path} was not created"
        )));
    }

    info!(device = %device_path, mac = %mac_upper, "bound rfcomm device");
    Ok(device_path)
}

/// Configure a file descriptor for raw TTY mode.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> io::Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> io::Result<()> {
    Ok(())
}

/// Open an RFCOMM TTY for raw writing.
fn open_raw(path: &str) -> io::Result<std::fs::File> {
    let file = OpenOptions::new().write(true).open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        configure_tty_raw(file.as_raw_fd())?;
    }
    Ok(file)
}

/// Writes to an RFCOMM TTY. A write completes once the kernel has it.
struct RfcommChannel {
    file: Mutex<tokio::fs::File>,
}

#[async_trait]
impl WriteChannel for RfcommChannel {
    fn capabilities(&self) -> WriteCapabilities {
        WriteCapabilities {
            unacknowledged: false,
            acknowledged: true,
        }
    }

    async fn write_unacknowledged(&self, data: &[u8]) -> io::Result<()> {
        self.write_acknowledged(data).await
    }

    async fn write_acknowledged(&self, data: &[u8]) -> io::Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(data).await?;
        file.flush().await
    }
}

struct OpenLink {
    address: String,
    device_path: String,
    link: Arc<LinkSender>,
}

/// BlueZ-backed serial bridge.
pub struct RfcommBridge {
    index: u8,
    open: Mutex<Option<OpenLink>>,
}

impl RfcommBridge {
    /// Bridge binding new devices to `/dev/rfcomm<index>`.
    pub fn new(index: u8) -> Self {
        Self {
            index,
            open: Mutex::new(None),
        }
    }

    /// A bridge, if this machine has BlueZ tooling and an adapter.
    pub async fn detect() -> Option<Self> {
        if !cfg!(target_os = "linux") {
            return None;
        }
        let has_adapter = std::fs::read_dir("/sys/class/bluetooth")
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if !has_adapter {
            debug!("no Bluetooth adapter in /sys/class/bluetooth");
            return None;
        }
        match Command::new("bluetoothctl").arg("--version").output().await {
            Ok(output) if output.status.success() => {
                info!(
                    version = %String::from_utf8_lossy(&output.stdout).trim(),
                    "using BlueZ serial bridge"
                );
                Some(Self::new(0))
            }
            _ => {
                debug!("bluetoothctl not available");
                None
            }
        }
    }

    async fn list(&self, args: &[&str]) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        let output = run("bluetoothctl", args).await?;
        if !output.status.success() {
            return Err(ConnectionError::Backend(format!(
                "bluetoothctl {} failed",
                args.join(" ")
            )));
        }
        Ok(parse_device_lines(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[async_trait]
impl SerialBridge for RfcommBridge {
    async fn paired_devices(&self) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        // BlueZ >= 5.65 takes a filter argument; older versions have paired-devices
        let devices = match self.list(&["devices", "Paired"]).await {
            Ok(devices) => devices,
            Err(_) => self.list(&["paired-devices"]).await?,
        };
        Ok(devices.into_iter().map(DeviceDescriptor::paired).collect())
    }

    async fn scan_devices(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        let secs = timeout.as_secs().max(1).to_string();
        run("bluetoothctl", &["--timeout", &secs, "scan", "on"]).await?;
        self.list(&["devices"]).await
    }

    async fn is_connected(&self) -> bool {
        self.open
            .lock()
            .await
            .as_ref()
            .is_some_and(|open| Path::new(&open.device_path).exists())
    }

    async fn open(&self, address: &str) -> Result<BridgeLink, ConnectionError> {
        if !is_valid_mac(address) {
            return Err(ConnectionError::DeviceUnreachable(format!(
                "invalid MAC address: {address}"
            )));
        }

        let device_path = match find_rfcomm_for_mac(address).await? {
            Some(path) => {
                debug!(device = %path, "reusing rfcomm binding");
                path
            }
            None => setup_rfcomm(address, self.index).await?,
        };

        let path = device_path.clone();
        let file = tokio::task::spawn_blocking(move || open_raw(&path))
            .await
            .map_err(|e| ConnectionError::Backend(e.to_string()))?
            .map_err(|e| {
                ConnectionError::DeviceUnreachable(format!("Failed to open {device_path}: {e}"))
            })?;

        let (tx, rx) = link_watch();
        let tx = Arc::new(tx);
        tokio::spawn(watch_tty(device_path.clone(), tx.clone()));

        *self.open.lock().await = Some(OpenLink {
            address: address.to_uppercase(),
            device_path: device_path.clone(),
            link: tx,
        });

        Ok(BridgeLink {
            device: DeviceDescriptor::new(device_path, address.to_uppercase()).paired(),
            channel: Arc::new(RfcommChannel {
                file: Mutex::new(tokio::fs::File::from_std(file)),
            }),
            link: rx,
        })
    }

    async fn close(&self) {
        if let Some(open) = self.open.lock().await.take() {
            info!(address = %open.address, device = %open.device_path, "closing rfcomm link");
            let _ = open.link.send(false);
        }
    }
}

/// Flip the link watch once the TTY disappears (printer off, out of range).
async fn watch_tty(device_path: String, link: Arc<LinkSender>) {
    let mut interval = tokio::time::interval(LINK_POLL);
    loop {
        interval.tick().await;
        if link.is_closed() || !*link.borrow() {
            break;
        }
        if !Path::new(&device_path).exists() {
            warn!(device = %device_path, "rfcomm device vanished");
            let _ = link.send(false);
            break;
        }
    }
}
