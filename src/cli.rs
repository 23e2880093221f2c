use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Stop after this many seconds.
    #[arg(long)]
    pub duration: Option<u64>,

    /// Open the scope window instead of logging to the terminal.
    #[arg(long, default_value_t = false)]
    pub gui: bool,

    #[command(flatten)]
    pub feed: FeedArgs,

    #[arg(short, long, default_value_t = log::LevelFilter::Info)]
    pub logging_level: log::LevelFilter,

    /// TOML configuration; built-in defaults are used when absent.
    #[arg(long)]
    pub config_file: Option<std::path::PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct FeedArgs {
    /// Append every fetched aircraft document to this file, one per line.
    #[arg(long, default_value = None)]
    pub log_input_data_stream: Option<std::path::PathBuf>,

    /// Replay aircraft documents from this file instead of polling the receiver.
    #[arg(long, default_value = None)]
    pub read_input_data_stream: Option<std::path::PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn when_no_arguments_given_then_defaults_apply() {
        let cli = Cli::try_parse_from(["radarscope"]).expect("valid arguments");
        assert!(cli.config_file.is_none());
        assert!(!cli.gui);
        assert_eq!(cli.logging_level, log::LevelFilter::Info);
        assert!(cli.feed.read_input_data_stream.is_none());
    }

    #[test]
    fn when_replay_and_duration_given_then_parsed() {
        let cli = Cli::try_parse_from([
            "radarscope",
            "--read-input-data-stream",
            "feed.jsonl",
            "--duration",
            "30",
            "-l",
            "debug",
        ])
        .expect("valid arguments");
        assert_eq!(
            cli.feed.read_input_data_stream,
            Some(std::path::PathBuf::from("feed.jsonl"))
        );
        assert_eq!(cli.duration, Some(30));
        assert_eq!(cli.logging_level, log::LevelFilter::Debug);
    }
}
