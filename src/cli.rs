use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::env;

use crate::config::ConfigState;
use crate::{pipeline, replay};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    // Flags-based help (-h/--help)
    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("watch") => {
            let device: Option<String> = pargs.opt_value_from_str("--device")?;
            let cfg = ConfigState::load_or_install_default()?;
            pipeline::run_watch(&cfg, device.as_deref())
        }

        Some("replay") => {
            let trace: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: tapctl replay <trace.json>"))?;
            let cfg = ConfigState::load_or_install_default()?;
            replay::run_replay(&trace, cfg.profile.thresholds.clone())
        }

        Some("list") => {
            let cfg = ConfigState::load_or_install_default()?;
            for name in cfg.list_profiles() {
                if name == cfg.active_name {
                    println!("* {name}");
                } else {
                    println!("  {name}");
                }
            }
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: tapctl use <profile_name>"))?;
            let mut cfg = ConfigState::load_or_install_default()?;
            cfg.set_active(&name)?;
            println!("active profile: {}", cfg.active_name);
            Ok(())
        }

        Some("doctor") => {
            let cfg = ConfigState::load_or_install_default()?;
            print_response(&cfg.doctor_report());
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!(
        r#"tapctl — tap gesture disambiguator (single / double / long-press)

USAGE:
  tapctl help [command]          Show general or command-specific help
  tapctl watch [--device PATH]   Watch input devices and dispatch gestures
  tapctl replay <trace.json>     Classify a recorded event trace offline
  tapctl list                    List profiles
  tapctl use <name>              Switch active profile
  tapctl doctor                  Diagnose permissions/devices

TIPS:
  - Profiles: ~/.config/tapctl/profiles
  - Active profile pointer: ~/.config/tapctl/active
  - RUST_LOG=debug shows every raw event the classifier sees
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "watch" => println!(
            "usage: tapctl watch [--device PATH]\nWatches all detected touch/pointer devices (or just PATH) and\ndispatches recognized gestures through the active profile's bindings."
        ),
        "replay" => println!(
            "usage: tapctl replay <trace.json>\nFeeds a JSON array of raw events through the classifier on the\ntrace's own clock and prints every recognized gesture."
        ),
        "list" => {
            println!("usage: tapctl list\nLists available profiles; marks active with '*'.")
        }
        "use" => {
            println!("usage: tapctl use <name>\nSwitches active profile to <name>.")
        }
        "doctor" => println!(
            "usage: tapctl doctor\nChecks permissions and lists detected input devices."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
