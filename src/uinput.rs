//! Virtual keyboard device over /dev/uinput
//!
//! `emit` queues events; `flush` appends a SYN_REPORT and hands the whole
//! cycle to the kernel in a single write, so downstream readers see each
//! poll cycle as one update.

use crate::keyboard::keymap::KeyCode;
use crate::sink::{OutputSink, SinkError};
use log::{info, warn};
use nix::libc;
use nix::{ioctl_none, ioctl_write_int, ioctl_write_ptr};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;

const UINPUT_PATH: &str = "/dev/uinput";
const UINPUT_MAX_NAME_SIZE: usize = 80;

const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const SYN_REPORT: u16 = 0x00;
const BUS_USB: u16 = 0x03;

const VENDOR_ID: u16 = 0x0001;
const PRODUCT_ID: u16 = 0x0001;
const VERSION: u16 = 0x0001;

/// Linux input_event structure (64-bit time fields)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct InputEvent {
    tv_sec: i64,
    tv_usec: i64,
    event_type: u16,
    code: u16,
    value: i32,
}

const INPUT_EVENT_SIZE: usize = std::mem::size_of::<InputEvent>();

/// Linux input_id structure
#[repr(C)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

/// Linux uinput_setup structure
#[repr(C)]
struct UinputSetup {
    id: InputId,
    name: [u8; UINPUT_MAX_NAME_SIZE],
    ff_effects_max: u32,
}

ioctl_write_int!(ui_set_evbit, b'U', 100);
ioctl_write_int!(ui_set_keybit, b'U', 101);
ioctl_write_ptr!(ui_dev_setup, b'U', 3, UinputSetup);
ioctl_none!(ui_dev_create, b'U', 1);
ioctl_none!(ui_dev_destroy, b'U', 2);

fn setup_error(op: &'static str, errno: nix::errno::Errno) -> SinkError {
    SinkError::Setup {
        op,
        source: io::Error::from_raw_os_error(errno as i32),
    }
}

fn encode_name(name: &str) -> [u8; UINPUT_MAX_NAME_SIZE] {
    let mut buf = [0u8; UINPUT_MAX_NAME_SIZE];
    let bytes = name.as_bytes();
    let len = bytes.len().min(UINPUT_MAX_NAME_SIZE - 1);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

/// Output sink backed by a kernel-created virtual keyboard.
///
/// Only the key codes registered at creation can be emitted; the kernel
/// silently drops events for anything else.
pub struct UinputSink {
    device: File,
    queue: Vec<InputEvent>,
}

impl UinputSink {
    /// Create the virtual device, registering every key the layout and
    /// rule set can emit
    pub fn create<I>(name: &str, keys: I) -> Result<Self, SinkError>
    where
        I: IntoIterator<Item = KeyCode>,
    {
        Self::create_at(UINPUT_PATH, name, keys)
    }

    fn create_at<I>(path: &str, name: &str, keys: I) -> Result<Self, SinkError>
    where
        I: IntoIterator<Item = KeyCode>,
    {
        let device = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| {
                if source.kind() == io::ErrorKind::PermissionDenied {
                    warn!("cannot open {path}; run as root or grant your user access to it");
                }
                SinkError::Open {
                    path: path.to_string(),
                    source,
                }
            })?;
        let fd = device.as_raw_fd();

        unsafe { ui_set_evbit(fd, EV_KEY as libc::c_ulong) }
            .map_err(|errno| setup_error("UI_SET_EVBIT", errno))?;
        let mut registered = 0usize;
        for key in keys {
            unsafe { ui_set_keybit(fd, key.as_u16() as libc::c_ulong) }
                .map_err(|errno| setup_error("UI_SET_KEYBIT", errno))?;
            registered += 1;
        }

        let setup = UinputSetup {
            id: InputId {
                bustype: BUS_USB,
                vendor: VENDOR_ID,
                product: PRODUCT_ID,
                version: VERSION,
            },
            name: encode_name(name),
            ff_effects_max: 0,
        };
        unsafe { ui_dev_setup(fd, &setup) }.map_err(|errno| setup_error("UI_DEV_SETUP", errno))?;
        unsafe { ui_dev_create(fd) }.map_err(|errno| setup_error("UI_DEV_CREATE", errno))?;

        info!("virtual keyboard \"{name}\" created, {registered} keys registered");
        Ok(Self {
            device,
            queue: Vec::new(),
        })
    }
}

impl OutputSink for UinputSink {
    fn emit(&mut self, key: KeyCode, down: bool) -> Result<(), SinkError> {
        // Timestamps stay zero; the kernel stamps uinput writes itself
        self.queue.push(InputEvent {
            tv_sec: 0,
            tv_usec: 0,
            event_type: EV_KEY,
            code: key.as_u16(),
            value: i32::from(down),
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        if self.queue.is_empty() {
            return Ok(());
        }
        self.queue.push(InputEvent {
            tv_sec: 0,
            tv_usec: 0,
            event_type: EV_SYN,
            code: SYN_REPORT,
            value: 0,
        });
        let bytes = unsafe {
            std::slice::from_raw_parts(
                self.queue.as_ptr() as *const u8,
                self.queue.len() * INPUT_EVENT_SIZE,
            )
        };
        let result = self.device.write_all(bytes);
        self.queue.clear();
        result?;
        Ok(())
    }
}

impl Drop for UinputSink {
    fn drop(&mut self) {
        let _ = unsafe { ui_dev_destroy(self.device.as_raw_fd()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::keymap::KEY_Z;

    #[test]
    fn input_event_layout_matches_the_kernel() {
        assert_eq!(INPUT_EVENT_SIZE, 24);
    }

    #[test]
    fn names_are_truncated_and_nul_terminated() {
        let buf = encode_name(&"x".repeat(200));
        assert_eq!(buf[UINPUT_MAX_NAME_SIZE - 1], 0);
        assert!(buf[..UINPUT_MAX_NAME_SIZE - 1].iter().all(|&b| b == b'x'));

        let buf = encode_name("Tandy 102 Keyboard");
        assert_eq!(&buf[..18], b"Tandy 102 Keyboard");
        assert_eq!(buf[18], 0);
    }

    #[test]
    fn create_fails_gracefully_on_a_regular_file() {
        // A plain file accepts the open but rejects the ioctls
        let path = std::env::temp_dir().join(format!("keymatrix-uinput-{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();

        let result = UinputSink::create_at(path.to_str().unwrap(), "test device", [KEY_Z]);
        match result {
            Err(SinkError::Setup { op: "UI_SET_EVBIT", .. }) => {}
            Err(other) => panic!("Expected Setup error, got {other}"),
            Ok(_) => panic!("Expected Setup error, got a device"),
        }

        let _ = std::fs::remove_file(&path);
    }
}
