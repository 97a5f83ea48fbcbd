use std::env;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub validate_config: bool,
    pub show_version: bool,
    pub show_help: bool,
    pub decode_path: Option<String>,
    pub parser: Option<String>,
}

impl CliArgs {
    pub fn parse() -> Self {
        Self::from_args(env::args().collect())
    }

    fn from_args(args: Vec<String>) -> Self {
        let mut decode_path = None;
        let mut parser = None;

        for (i, arg) in args.iter().enumerate() {
            if arg == "--decode" && i + 1 < args.len() {
                decode_path = Some(args[i + 1].clone());
            } else if arg == "--parser" && i + 1 < args.len() {
                parser = Some(args[i + 1].clone());
            }
        }

        Self {
            validate_config: args.iter().any(|a| a == "--validate-config"),
            show_version: args.iter().any(|a| a == "--version" || a == "-V"),
            show_help: args.iter().any(|a| a == "--help" || a == "-h"),
            decode_path,
            parser,
        }
    }

    pub fn print_help() {
        println!("csr-parser-server {}", VERSION);
        println!();
        println!("Decodes PKCS#10 certificate signing requests (PEM or DER) into JSON");
        println!();
        println!("USAGE:");
        println!("    csr-parser-server [OPTIONS]");
        println!();
        println!("OPTIONS:");
        println!("    --validate-config    Validate configuration and exit");
        println!("    --decode <PATH>      Decode a local CSR file, print the JSON and exit");
        println!("    --parser <BACKEND>   Backend for --decode: custom (default) or library");
        println!("    -V, --version        Print version information");
        println!("    -h, --help           Print help information");
        println!();
        println!("ENVIRONMENT VARIABLES:");
        println!("    CSR_PARSER_CONFIG              Path to config file");
        println!("    CSR_PARSER_HOST                Server host (default: 0.0.0.0)");
        println!("    CSR_PARSER_PORT                Server port (default: 8080)");
        println!("    CSR_PARSER_LOG_LEVEL           Log level (default: info)");
        println!("    CSR_PARSER_MAX_INPUT_BYTES     Largest accepted request body (default: 65536)");
        println!("    CSR_PARSER_TLS_CERT            TLS certificate (PEM)");
        println!("    CSR_PARSER_TLS_KEY             TLS private key (PEM)");
    }

    pub fn print_version() {
        println!("csr-parser-server {}", VERSION);
    }
}
