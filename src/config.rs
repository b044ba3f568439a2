use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
    #[serde(default)]
    pub allow_commands: bool,
}

/// Timing knobs of the classifier plus the tracker's movement tolerance.
/// The debounce and suppression defaults are empirical; they are profile
/// fields precisely so platforms that need different values can set them.
#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    /// Max gap between two taps to count as a double-click.
    #[serde(default = "default_double_click_ms")]
    pub double_click_ms: u64,
    /// Min hold time for a long press.
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
    /// Window in which a second report of the same physical tap is dropped.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Window after a double-tap in which synthetic clicks are dropped.
    #[serde(default = "default_suppress_ms")]
    pub suppress_ms: u64,
    /// Normalized movement beyond which a contact counts as moving.
    #[serde(default = "default_move_tol")]
    pub move_tol: f32,
}

fn default_double_click_ms() -> u64 {
    300
}
fn default_long_press_ms() -> u64 {
    800
}
fn default_debounce_ms() -> u64 {
    50
}
fn default_suppress_ms() -> u64 {
    100
}
fn default_move_tol() -> f32 {
    0.015
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            double_click_ms: default_double_click_ms(),
            long_press_ms: default_long_press_ms(),
            debounce_ms: default_debounce_ms(),
            suppress_ms: default_suppress_ms(),
            move_tol: default_move_tol(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub meta: Meta,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub bindings: HashMap<String, String>,
}

const BINDING_KEYS: [&str; 3] = ["single_click", "double_click", "long_press"];

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("thresholds must be positive durations")]
    NonPositiveThreshold,
    #[error("thresholds.move_tol must be in (0,1) normalized units")]
    MoveTolOutOfRange,
    #[error("thresholds.debounce_ms ({0}) must be shorter than double_click_ms ({1})")]
    DebounceTooWide(u64, u64),
    #[error("unknown binding key '{0}'")]
    UnknownBinding(String),
    #[error("binding '{0}' has invalid action '{1}'")]
    InvalidAction(String, String),
    #[error("binding '{0}' uses cmd: but allow_commands=false")]
    CommandsDisabled(String),
}

pub fn validate_profile(p: &Profile) -> std::result::Result<(), ProfileError> {
    let th = &p.thresholds;
    if th.double_click_ms == 0 || th.long_press_ms == 0 || th.suppress_ms == 0 {
        return Err(ProfileError::NonPositiveThreshold);
    }
    if !(0.0..1.0).contains(&th.move_tol) {
        return Err(ProfileError::MoveTolOutOfRange);
    }
    if th.debounce_ms >= th.double_click_ms {
        return Err(ProfileError::DebounceTooWide(
            th.debounce_ms,
            th.double_click_ms,
        ));
    }

    for (k, v) in &p.bindings {
        if !BINDING_KEYS.contains(&k.as_str()) {
            return Err(ProfileError::UnknownBinding(k.clone()));
        }
        let ok = v == "log" || v.starts_with("cmd:");
        if !ok {
            return Err(ProfileError::InvalidAction(k.clone(), v.clone()));
        }
        if v.starts_with("cmd:") && !p.meta.allow_commands {
            return Err(ProfileError::CommandsDisabled(k.clone()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
    pub detected_devices: Vec<String>,
}

fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("tapctl"))
}

fn profiles_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("profiles"))
}

fn active_ptr_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("active"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl ConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        let cfgdir = config_dir()?;
        let profdir = profiles_dir()?;
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = active_ptr_path()?;
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = Self::load_profile(&active_name)?;
        let detected_devices = crate::input::describe_devices();

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
            detected_devices,
        })
    }

    pub fn reload(&mut self) -> Result<()> {
        self.profile = Self::load_profile(&self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.reload()?;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                if let Some(ext) = e.path().extension() {
                    if ext == "toml" {
                        if let Some(stem) = e.path().file_stem().and_then(|s| s.to_str()) {
                            v.push(stem.to_string());
                        }
                    }
                }
            }
        }
        v.sort();
        v
    }

    fn load_profile(name: &str) -> Result<Profile> {
        let path = profiles_dir()?.join(format!("{name}.toml"));
        let txt = fs::read_to_string(&path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        parse_profile(&txt).map_err(|e| anyhow!("failed to load {}: {e}", path.display()))
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let in_input_group = check_in_input_group();
        serde_json::json!({
            "input_group_member": in_input_group,
            "dev_input_readable": Path::new("/dev/input").read_dir().is_ok(),
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "devices": self.detected_devices,
            "hints": {
                "add_user_to_input_group": "sudo usermod -aG input $USER && newgrp input"
            }
        })
    }
}

fn parse_profile(txt: &str) -> Result<Profile> {
    let profile: Profile = toml::from_str(txt)?;
    validate_profile(&profile)?;
    Ok(profile)
}

fn check_in_input_group() -> bool {
    if let Ok(s) = fs::read_to_string("/etc/group") {
        let user = whoami::username();
        for line in s.lines() {
            if line.starts_with("input:") {
                if line
                    .split(':')
                    .nth(3)
                    .unwrap_or("")
                    .split(',')
                    .any(|u| u == user)
                {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_default_profile_is_valid() {
        let p = parse_profile(default_profile_text()).unwrap();
        assert_eq!(p.thresholds.double_click_ms, 300);
        assert_eq!(p.thresholds.long_press_ms, 800);
        assert_eq!(p.thresholds.debounce_ms, 50);
        assert_eq!(p.thresholds.suppress_ms, 100);
        assert!(!p.meta.allow_commands);
    }

    #[test]
    fn omitted_thresholds_fall_back_to_defaults() {
        let p = parse_profile("[meta]\nname = \"bare\"\n").unwrap();
        assert_eq!(p.thresholds.double_click_ms, 300);
        assert_eq!(p.thresholds.suppress_ms, 100);
        assert!(p.bindings.is_empty());
    }

    #[test]
    fn rejects_unknown_binding_key() {
        let txt = "[meta]\nname = \"x\"\n[bindings]\ntriple_click = \"log\"\n";
        let err = parse_profile(txt).unwrap_err();
        assert!(err.to_string().contains("unknown binding key"));
    }

    #[test]
    fn rejects_commands_when_not_allowed() {
        let txt = "[meta]\nname = \"x\"\n[bindings]\nlong_press = \"cmd:true\"\n";
        let err = parse_profile(txt).unwrap_err();
        assert!(err.to_string().contains("allow_commands=false"));

        let txt =
            "[meta]\nname = \"x\"\nallow_commands = true\n[bindings]\nlong_press = \"cmd:true\"\n";
        parse_profile(txt).unwrap();
    }

    #[test]
    fn rejects_debounce_wider_than_double_click_window() {
        let txt = "[meta]\nname = \"x\"\n[thresholds]\ndebounce_ms = 400\n";
        let err = parse_profile(txt).unwrap_err();
        assert!(err.to_string().contains("debounce_ms"));
    }
}
