// Startup module - displays banner and module status
//
// Printed to stdout before the server starts accepting requests.

use crate::config::{Config, KeySource, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Module status for display
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleStatus {
    pub name: &'static str,
    pub enabled: bool,
    pub description: String,
}

/// Print the startup banner and module status
pub fn print_startup(config: &Config, key_source: KeySource, components: &[String]) {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}wirebound{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Server-driven UI components over signed state{RESET}");
    println!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    for module in module_status(config, key_source, components) {
        print_module_status(&module);
    }
    println!();

    println!(
        "  {MAGENTA}▸{RESET} Wire server listening on {BOLD}{}{RESET}",
        config.bind_addr
    );
    if key_source == KeySource::Generated {
        println!(
            "  {YELLOW}▸{RESET} {YELLOW}Ephemeral signing key{RESET} {DIM}(tokens reset on restart){RESET}"
        );
    }
    println!();
}

/// Status of each module for the current configuration
pub fn module_status(
    config: &Config,
    key_source: KeySource,
    components: &[String],
) -> Vec<ModuleStatus> {
    let signing = match key_source {
        KeySource::Configured => "State signing (configured key)".to_string(),
        KeySource::Generated => "State signing (generated key)".to_string(),
    };
    let expiry = match config.security.max_token_age_secs {
        0 => "Token expiry (off)".to_string(),
        secs => format!("Token expiry ({}s)", secs),
    };

    vec![
        ModuleStatus {
            name: "codec",
            enabled: true,
            description: signing,
        },
        ModuleStatus {
            name: "expiry",
            enabled: config.security.max_token_age_secs > 0,
            description: expiry,
        },
        ModuleStatus {
            name: "registry",
            enabled: !components.is_empty(),
            description: format!("{} component type(s)", components.len()),
        },
        ModuleStatus {
            name: "demo",
            enabled: config.demo.enabled,
            description: "Counter, todo list, notifier".to_string(),
        },
        ModuleStatus {
            name: "file-log",
            enabled: config.logging.file_enabled,
            description: format!("JSON logs in {}", config.logging.file_dir.display()),
        },
    ]
}

fn print_module_status(module: &ModuleStatus) {
    use colors::*;

    let (icon, style) = if module.enabled {
        (format!("{GREEN}✓{RESET}"), "")
    } else {
        (format!("{DIM}○{RESET}"), DIM)
    };

    println!(
        "    {icon} {style}{:<12}{RESET} {DIM}{}{RESET}",
        module.name, module.description
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_status_reflects_config() {
        let mut config = Config::default();
        config.security.max_token_age_secs = 60;
        config.demo.enabled = false;

        let modules = module_status(&config, KeySource::Generated, &["counter".to_string()]);
        let by_name = |name: &str| modules.iter().find(|m| m.name == name).unwrap().clone();

        assert_eq!(by_name("codec").description, "State signing (generated key)");
        assert!(by_name("expiry").enabled);
        assert_eq!(by_name("expiry").description, "Token expiry (60s)");
        assert_eq!(by_name("registry").description, "1 component type(s)");
        assert!(!by_name("demo").enabled);
        assert!(!by_name("file-log").enabled);
    }
}
