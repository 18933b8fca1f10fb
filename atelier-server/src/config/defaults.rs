//! Default configuration values
//!
//! Used when no config file exists. Platform-dependent values (install root,
//! script host) are filled in by the schema defaults and are shown here
//! commented out.

/// Default configuration as TOML (for reference/documentation)
pub const DEFAULT_CONFIG_TOML: &str = r##"
# atelier configuration

[bridge]
host = "127.0.0.1"
port = 8080
# Frames queued per connection before sends start failing
outbound_queue = 256

[assets]
host = "127.0.0.1"
port = 8081
# root = "~/.local/share/atelier/assets"
# public_base_url = "http://localhost:8081"

[tools]
# install_root = "C:\\Program Files\\Adobe"
generation_delay_ms = 3000
# scratch_dir = "/run/user/1000/atelier/scripts"

# [tools.script_host]
# program = "cscript"
# args = ["//nologo"]
# extension = "vbs"
# template = "..."
# quote = "vbs"   # none, vbs, applescript or shell
"##;
