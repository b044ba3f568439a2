//! Input device discovery (evdev 0.13.2 compatible)

use evdev::{AbsoluteAxisCode, Device, EventType, KeyCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Touchscreen/touchpad with ABS_MT slots.
    Multitouch,
    /// Mouse-like device with a left button.
    Pointer,
}

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub kind: DeviceKind,
}

/// Walk /dev/input and classify every readable event node that can feed the
/// classifier: multitouch first, plain pointer devices second.
pub fn discover() -> Vec<DeviceInfo> {
    let mut out = vec![];
    if let Ok(rd) = std::fs::read_dir("/dev/input") {
        for e in rd.flatten() {
            let p = e.path();
            if p.file_name()
                .and_then(|s| s.to_str())
                .map(|s| s.starts_with("event"))
                .unwrap_or(false)
            {
                if let Ok(dev) = Device::open(&p) {
                    if let Some(kind) = classify(&dev) {
                        out.push(DeviceInfo {
                            path: p.display().to_string(),
                            name: dev.name().unwrap_or("unknown").to_string(),
                            kind,
                        });
                    }
                }
            }
        }
    }
    out.sort_by_key(|d| d.kind == DeviceKind::Pointer);
    out
}

pub fn classify(dev: &Device) -> Option<DeviceKind> {
    let has_abs = dev.supported_events().contains(EventType::ABSOLUTE);
    let axes = dev.supported_absolute_axes();
    let has_mt = axes.map_or(false, |a| {
        a.contains(AbsoluteAxisCode::ABS_MT_SLOT)
            && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_X)
            && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_Y)
    });
    if has_abs && has_mt {
        return Some(DeviceKind::Multitouch);
    }

    let has_left_button = dev
        .supported_keys()
        .map_or(false, |k| k.contains(KeyCode::BTN_LEFT));
    if has_left_button {
        return Some(DeviceKind::Pointer);
    }
    None
}

/// Human-readable device list for `status`/`doctor` output.
pub fn describe_devices() -> Vec<String> {
    discover()
        .into_iter()
        .map(|d| {
            let kind = match d.kind {
                DeviceKind::Multitouch => "multitouch",
                DeviceKind::Pointer => "pointer",
            };
            format!("{} ({}, {})", d.name, d.path, kind)
        })
        .collect()
}
