//! Command-line interface for fontpress.
//!
//! With no subcommand the binary runs the MCP server on stdio. The other
//! subcommands call the same service once and print its JSON to stdout.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fontpress_config::LogLevel;
use serde_json::{Map, Value, json};

/// fontpress - publish installed fonts as content-addressed WOFF2 web fonts
#[derive(Parser, Debug)]
#[command(name = "fontpress")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: ~/.config/fontpress/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set log level (overrides config and FONTPRESS_LOG)
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Off => LogLevel::Off,
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the MCP server on stdin/stdout (default)
    Serve,

    /// List installed font families
    Families,

    /// List the faces of one family
    Faces {
        /// Family name, e.g. "Helvetica"
        family: String,
    },

    /// Describe one face
    Overview {
        /// PostScript name, e.g. "Helvetica-Bold"
        post_script_name: String,
    },

    /// Convert and upload one face
    Publish(PublishArgs),

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug, PartialEq)]
pub struct PublishArgs {
    /// PostScript name of the face to publish
    pub post_script_name: String,

    /// Bucket (default: publish.bucket from config)
    #[arg(long)]
    pub bucket: Option<String>,

    #[arg(long)]
    pub prefix: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    /// Upload without a public-read ACL
    #[arg(long)]
    pub private: bool,

    /// Cache-Control max-age; 0 omits the header
    #[arg(long, value_name = "SECONDS")]
    pub cache_seconds: Option<u64>,

    /// Upload even if the object already exists
    #[arg(long)]
    pub overwrite: bool,

    /// Subset to the characters of this text
    #[arg(long, group = "subset")]
    pub text: Option<String>,

    /// Subset to code points, e.g. U+0041
    #[arg(long, group = "subset", value_delimiter = ',', num_args = 1..)]
    pub unicodes: Option<Vec<String>>,

    /// Subset to ranges, e.g. U+0000-00FF
    #[arg(long, group = "subset", value_delimiter = ',', num_args = 1..)]
    pub ranges: Option<Vec<String>>,

    /// Subset to a language or script, e.g. latin, cyrillic, de
    #[arg(long, group = "subset")]
    pub language: Option<String>,

    /// Pin a variable font to a named instance
    #[arg(long, conflicts_with = "axis")]
    pub named_instance: Option<String>,

    /// Pin a variable axis, e.g. wght=700 (repeatable)
    #[arg(long, value_name = "TAG=VALUE", value_parser = parse_axis)]
    pub axis: Vec<(String, f32)>,

    /// Strip TrueType hinting
    #[arg(long)]
    pub drop_hints: bool,

    /// Drop GSUB/GPOS/GDEF when subsetting
    #[arg(long)]
    pub no_layout: bool,
}

fn parse_axis(value: &str) -> Result<(String, f32), String> {
    let (tag, number) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TAG=VALUE, got '{value}'"))?;
    let number = number
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("invalid axis value '{number}': {e}"))?;
    Ok((tag.trim().to_string(), number))
}

impl PublishArgs {
    /// The equivalent `publish_font` tool arguments, so the CLI goes through
    /// the same validation as MCP clients.
    pub fn to_arguments(&self) -> Value {
        let mut convert = Map::new();
        if let Some(text) = &self.text {
            convert.insert("subset_mode".into(), json!("text"));
            convert.insert("text".into(), json!(text));
        }
        if let Some(unicodes) = &self.unicodes {
            convert.insert("subset_mode".into(), json!("unicodes"));
            convert.insert("unicodes".into(), json!(unicodes));
        }
        if let Some(ranges) = &self.ranges {
            convert.insert("subset_mode".into(), json!("ranges"));
            convert.insert("ranges".into(), json!(ranges));
        }
        if let Some(language) = &self.language {
            convert.insert("subset_mode".into(), json!("language"));
            convert.insert("language".into(), json!(language));
        }
        if let Some(name) = &self.named_instance {
            convert.insert("named_instance".into(), json!(name));
        }
        if !self.axis.is_empty() {
            let axes: BTreeMap<&str, f32> =
                self.axis.iter().map(|(tag, v)| (tag.as_str(), *v)).collect();
            convert.insert("target_axes".into(), json!(axes));
        }
        if self.drop_hints {
            convert.insert("drop_hints".into(), json!(true));
        }
        if self.no_layout {
            convert.insert("retain_gsub_gpos".into(), json!(false));
        }

        let mut publish = Map::new();
        if let Some(bucket) = &self.bucket {
            publish.insert("bucket".into(), json!(bucket));
        }
        if let Some(prefix) = &self.prefix {
            publish.insert("prefix".into(), json!(prefix));
        }
        if let Some(region) = &self.region {
            publish.insert("region".into(), json!(region));
        }
        if self.private {
            publish.insert("public".into(), json!(false));
        }
        if let Some(secs) = self.cache_seconds {
            publish.insert("cache_seconds".into(), json!(secs));
        }
        if self.overwrite {
            publish.insert("overwrite".into(), json!(true));
        }

        let mut arguments = json!({
            "postScriptName": self.post_script_name,
            "publish": publish,
        });
        if !convert.is_empty() {
            arguments["convert"] = Value::Object(convert);
        }
        arguments
    }
}
