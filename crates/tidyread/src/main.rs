// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! tidyread command line.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tidyread_core::RuleType;

/// tidyread - chat autoread and autoreact engine.
#[derive(Parser, Debug)]
#[command(name = "tidyread", version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the XDG lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration and print a summary.
    CheckConfig,
    /// Inspect or change automation rules.
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    /// Inspect or clear jobs that exhausted their retries.
    DeadLetters {
        #[command(subcommand)]
        action: DeadLettersAction,
    },
}

#[derive(Subcommand, Debug)]
enum RulesAction {
    /// Print every stored rule as JSON.
    List,
    /// Enable a rule for a chat or forum topic.
    Enable {
        #[arg(long, allow_hyphen_values = true)]
        chat_id: i64,
        #[arg(long)]
        topic_id: Option<i64>,
        #[arg(long = "type", default_value = "autoread")]
        rule_type: RuleType,
        /// Reaction emoji for autoreact rules.
        #[arg(long)]
        emoji: Option<String>,
    },
    /// Disable the rule of exactly this scope.
    Disable {
        #[arg(long, allow_hyphen_values = true)]
        chat_id: i64,
        #[arg(long)]
        topic_id: Option<i64>,
        #[arg(long = "type", default_value = "autoread")]
        rule_type: RuleType,
    },
}

#[derive(Subcommand, Debug)]
enum DeadLettersAction {
    /// Print the newest records as JSON.
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Delete every record.
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tidyread_config::load_and_validate_path(path),
        None => tidyread_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tidyread_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    tidyread::telemetry::init_tracing(&config.app.log_level);

    let result = match cli.command {
        Commands::CheckConfig => {
            commands::check_config(&config);
            Ok(())
        }
        Commands::Rules { action } => match action {
            RulesAction::List => commands::list_rules(&config).await,
            RulesAction::Enable {
                chat_id,
                topic_id,
                rule_type,
                emoji,
            } => commands::set_rule(&config, chat_id, topic_id, rule_type, true, emoji).await,
            RulesAction::Disable {
                chat_id,
                topic_id,
                rule_type,
            } => commands::set_rule(&config, chat_id, topic_id, rule_type, false, None).await,
        },
        Commands::DeadLetters { action } => match action {
            DeadLettersAction::List { limit } => commands::list_dead_letters(&config, limit).await,
            DeadLettersAction::Clear => commands::clear_dead_letters(&config).await,
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_rule_enable_with_negative_chat() {
        let cli = Cli::try_parse_from([
            "tidyread", "rules", "enable", "--chat-id", "-100", "--topic-id", "7", "--type",
            "autoreact", "--emoji", "👍",
        ])
        .unwrap();
        match cli.command {
            Commands::Rules {
                action:
                    RulesAction::Enable {
                        chat_id,
                        topic_id,
                        rule_type,
                        emoji,
                    },
            } => {
                assert_eq!(chat_id, -100);
                assert_eq!(topic_id, Some(7));
                assert_eq!(rule_type, RuleType::Autoreact);
                assert_eq!(emoji.as_deref(), Some("👍"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn dead_letter_limit_defaults_to_fifty() {
        let cli = Cli::try_parse_from(["tidyread", "dead-letters", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::DeadLetters {
                action: DeadLettersAction::List { limit: 50 }
            }
        ));
    }

    #[test]
    fn rejects_unknown_rule_type() {
        assert!(
            Cli::try_parse_from(["tidyread", "rules", "disable", "--chat-id", "1", "--type", "mute"])
                .is_err()
        );
    }
}
