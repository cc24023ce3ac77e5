//! Check command implementation.
//!
//! Verifies the configuration and that every source the sampler reads from is
//! accessible on this host.

use std::time::Duration;

use crate::collectors::filesystem::{read_mount_entry, read_statvfs};
use crate::config::{validate_effective_config, Config};
use crate::sampler::HostStats;
use crate::system::ProcfsHost;

/// Runs all host checks. Exits with status 1 if any of them fails.
pub fn command_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if check_host(&ProcfsHost::default(), config) {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}

/// Prints a report for `host` and returns whether every check passed.
pub fn check_host(host: &ProcfsHost, config: &Config) -> bool {
    println!("🔍 Herakles Host Exporter - System Check");
    println!("========================================");

    let mut all_ok = true;

    println!("\n🧮 Checking CPU counters...");
    match host.read_cpu_stats() {
        Ok(cores) => {
            println!("   ✅ {}/stat readable, {} cores", host.proc_root().display(), cores.len());
            match host.cpu_percent_per_core(Duration::from_millis(100)) {
                Ok(percent) => println!("   ✅ CPU sample over 100ms: {:?}", percent),
                Err(e) => {
                    println!("   ❌ CPU sampling failed: {}", e);
                    all_ok = false;
                }
            }
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n💾 Checking memory counters...");
    match host.memory() {
        Ok(mem) => println!(
            "   ✅ {}/meminfo readable: {} MB used of {} MB",
            host.proc_root().display(),
            mem.used_bytes / 1024 / 1024,
            mem.total_bytes / 1024 / 1024
        ),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    let mount = config.mount_path();
    println!("\n📁 Checking mount {}...", mount.display());
    match read_statvfs(mount) {
        Ok(fs) => {
            println!(
                "   ✅ statvfs ok: {} MB used of {} MB",
                fs.used_bytes / 1024 / 1024,
                fs.size_bytes / 1024 / 1024
            );
            match read_mount_entry(host.proc_root(), mount) {
                Ok(Some(entry)) => {
                    println!("   ✅ Mounted from {} ({})", entry.device, entry.fstype)
                }
                Ok(None) => println!(
                    "   ⚠️  {} is not a mount point; usage of its filesystem is reported",
                    mount.display()
                ),
                Err(e) => println!("   ⚠️  Mount table unavailable: {}", e),
            }
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    all_ok
}
