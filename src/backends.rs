//! Bus access backend registration and dispatch
//!
//! Backends are feature-gated. The registry below only lists the ones that
//! were compiled in, so the CLI help always matches the binary.

use crate::cli::Cli;
use pciheader_core::BusAccess;

/// Backend used when `--access` is not given
#[cfg(feature = "linux-sysfs")]
pub const DEFAULT_BACKEND: &str = "linux-sysfs";
/// Backend used when `--access` is not given
#[cfg(all(not(feature = "linux-sysfs"), feature = "dummy"))]
pub const DEFAULT_BACKEND: &str = "dummy";
/// Backend used when `--access` is not given
#[cfg(not(any(feature = "linux-sysfs", feature = "dummy")))]
pub const DEFAULT_BACKEND: &str = "none";

/// Information about a bus access backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

impl BackendInfo {
    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

/// All backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "linux-sysfs")]
    backends.push(BackendInfo {
        name: "linux-sysfs",
        aliases: &["sysfs", "linux_sysfs"],
        description: "Linux sysfs (/sys/bus/pci/devices)",
    });

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory example bus with a host bridge, root port, VGA and NIC",
    });

    backends
}

/// Help text listing every backend with its description
pub fn backend_help() -> String {
    let backends = available_backends();
    if backends.is_empty() {
        return "No bus access backends available (recompile with backend features enabled)"
            .to_string();
    }

    let mut help = String::from("Bus access backend\n\nAvailable backends:\n");
    for b in &backends {
        help.push_str(&format!("  {:12} - {}", b.name, b.description));
        if !b.aliases.is_empty() {
            help.push_str(&format!(" (aliases: {})", b.aliases.join(", ")));
        }
        help.push('\n');
    }
    help
}

/// Comma separated backend names for the CLI help
pub fn backend_names_short() -> String {
    let names: Vec<&str> = available_backends().iter().map(|b| b.name).collect();
    if names.is_empty() {
        "none (recompile with backend features enabled)".to_string()
    } else {
        names.join(", ")
    }
}

/// Resolve a backend name or alias to its primary name
pub fn find_backend(name: &str) -> Option<&'static str> {
    available_backends()
        .into_iter()
        .find(|b| b.answers_to(name))
        .map(|b| b.name)
}

/// Open the backend selected on the command line
///
/// The returned bus releases its resources when dropped.
#[allow(unused_variables)]
pub fn open_backend(cli: &Cli) -> Result<Box<dyn BusAccess>, Box<dyn std::error::Error>> {
    let name = find_backend(&cli.access).ok_or_else(|| {
        format!(
            "Unknown bus access backend '{}' (available: {})",
            cli.access,
            backend_names_short()
        )
    })?;
    log::debug!("Using bus access backend {}", name);

    match name {
        #[cfg(feature = "linux-sysfs")]
        "linux-sysfs" => {
            let bus = match &cli.sysfs_root {
                Some(root) => pciheader_sysfs::SysfsBus::with_root(root)?,
                None => pciheader_sysfs::SysfsBus::open()?,
            };
            Ok(Box::new(bus))
        }
        #[cfg(feature = "dummy")]
        "dummy" => Ok(Box::new(pciheader_dummy::DummyBus::sample())),
        _ => Err(format!("Backend '{}' is not built in", name).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_backend_aliases() {
        #[cfg(feature = "linux-sysfs")]
        {
            assert_eq!(find_backend("linux-sysfs"), Some("linux-sysfs"));
            assert_eq!(find_backend("sysfs"), Some("linux-sysfs"));
        }
        #[cfg(feature = "dummy")]
        assert_eq!(find_backend("dummy"), Some("dummy"));
        assert_eq!(find_backend("ch341a"), None);
    }

    #[test]
    fn test_help_lists_every_backend() {
        let short = backend_names_short();
        let long = backend_help();
        for backend in available_backends() {
            assert!(short.contains(backend.name));
            assert!(long.contains(backend.description));
        }
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        use clap::Parser;
        let cli = Cli::try_parse_from(["pciheader", "-a", "dummy", "0", "0", "0"]).unwrap();
        let mut bus = open_backend(&cli).unwrap();
        assert_eq!(bus.enumerate().unwrap().len(), 4);
    }

    #[test]
    fn test_open_unknown() {
        use clap::Parser;
        let cli = Cli::try_parse_from(["pciheader", "-a", "bogus", "0", "0", "0"]).unwrap();
        let err = open_backend(&cli).err().unwrap();
        assert!(err.to_string().contains("Unknown bus access backend 'bogus'"));
    }
}
