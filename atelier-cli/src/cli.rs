//! CLI argument parsing for the atelier client

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default bridge address
pub const DEFAULT_ADDR: &str = "ws://127.0.0.1:8080";

/// Default base of asset URLs
pub const DEFAULT_ASSET_BASE: &str = "http://localhost:8081";

/// Send envelopes to a running atelier bridge
#[derive(Parser, Debug)]
#[command(name = "atelier")]
#[command(about = "One-shot client for the atelier bridge")]
#[command(version)]
pub struct Cli {
    /// Bridge address (ws://host:port)
    #[arg(long, env = "ATELIER_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Keep the connection open and print received envelopes for SECS seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub wait: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a URL or data URL in the dashboard preview
    Preview {
        /// Image URL or base64 data URL
        url: String,
    },

    /// Send a design command to the design-tool plugin
    Design {
        /// Inline JSON, or a path to a JSON file
        input: String,
    },

    /// Insert an image into the design tool
    Image {
        /// Image file
        path: PathBuf,

        /// Layer name (default: file stem)
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value_t = 512)]
        width: u32,

        #[arg(long, default_value_t = 512)]
        height: u32,
    },

    /// Announce a file from the asset directory to every client
    Asset {
        /// Asset file; only its name is sent
        path: PathBuf,

        /// Base of the asset server URL
        #[arg(long, default_value = DEFAULT_ASSET_BASE)]
        asset_base: String,
    },

    /// Run a raster editor script through the bridge
    Script {
        /// Script file
        path: PathBuf,
    },

    /// Invoke any tool action
    Tool {
        tool: String,
        action: String,

        /// JSON object passed as the action data
        #[arg(long)]
        data: Option<String>,
    },

    /// Send a chat command
    Chat {
        /// Free text; multiple words are joined with spaces
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["atelier", "preview", "https://example.com/a.png"]).unwrap();
        assert_eq!(cli.addr, DEFAULT_ADDR);
        assert_eq!(cli.wait, None);
        assert!(matches!(cli.command, Command::Preview { .. }));
    }

    #[test]
    fn test_image_options() {
        let cli = Cli::try_parse_from([
            "atelier", "image", "logo.png", "--name", "Logo", "--width", "64",
        ])
        .unwrap();
        match cli.command {
            Command::Image {
                path,
                name,
                width,
                height,
            } => {
                assert_eq!(path, PathBuf::from("logo.png"));
                assert_eq!(name.as_deref(), Some("Logo"));
                assert_eq!(width, 64);
                assert_eq!(height, 512);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wait_and_chat_words() {
        let cli =
            Cli::try_parse_from(["atelier", "--wait", "5", "chat", "애니메이션", "만들어줘"]).unwrap();
        assert_eq!(cli.wait, Some(5));
        match cli.command {
            Command::Chat { text } => assert_eq!(text.join(" "), "애니메이션 만들어줘"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tool_requires_action() {
        assert!(Cli::try_parse_from(["atelier", "tool", "figma"]).is_err());
    }
}
