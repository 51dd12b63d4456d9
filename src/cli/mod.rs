use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slsdeploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every runtime present and deploy the service
    Deploy {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Remove the deployed service
    Remove {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// List the service's deployed functions
    List {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Print the parsed service descriptor as JSON
    Info {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Directory containing serverless.yml and the runtime sources
    #[arg(value_name = "DIRECTORY")]
    pub path: Option<PathBuf>,

    /// Provider the descriptor must declare (e.g., aws, google)
    #[arg(long, env = "SLSDEPLOY_PROVIDER")]
    pub provider: Option<String>,

    /// Extra option forwarded to sls as --NAME VALUE
    /// Can be specified multiple times
    #[arg(long = "opt", value_name = "NAME=VALUE", value_parser = parse_option)]
    pub options: Vec<(String, String)>,
}

fn parse_option(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid option `{}`: expected NAME=VALUE", raw))?;
    let name = name.trim_start_matches("--");
    if name.is_empty() {
        return Err(format!("invalid option `{}`: empty name", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option() {
        assert_eq!(
            parse_option("region=us-east-1").unwrap(),
            ("region".to_string(), "us-east-1".to_string())
        );
        assert_eq!(
            parse_option("--stage=a=b").unwrap(),
            ("stage".to_string(), "a=b".to_string())
        );
        assert!(parse_option("region").is_err());
        assert!(parse_option("=value").is_err());
    }

    #[test]
    fn test_deploy_args() {
        let cli = Cli::try_parse_from([
            "slsdeploy",
            "deploy",
            "./svc",
            "--provider",
            "aws",
            "--opt",
            "region=eu-west-1",
            "--opt",
            "aws-profile=ci",
        ])
        .unwrap();

        match cli.command {
            Commands::Deploy { service } => {
                assert_eq!(service.path, Some(PathBuf::from("./svc")));
                assert_eq!(service.provider.as_deref(), Some("aws"));
                assert_eq!(service.options.len(), 2);
                assert_eq!(service.options[1].0, "aws-profile");
            }
            _ => panic!("expected deploy"),
        }
    }
}
