//! Sign command - prints the authentication headers for a request
//!
//! Meant for integration testing and client debugging; it never contacts the
//! gateway.

use clap::Args;

use crate::infrastructure::gateway::authenticator::{
    API_KEY_HEADER, NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use crate::infrastructure::gateway::signature::{sign, SigningInput};

#[derive(Debug, Args)]
pub struct SignArgs {
    #[arg(long)]
    pub api_key: String,

    /// Credential signing secret
    #[arg(long, env = "BLACKLIST_SECRET", hide_env_values = true)]
    pub secret: String,

    #[arg(long, default_value = "POST")]
    pub method: String,

    #[arg(long)]
    pub path: String,

    /// Exact request body bytes
    #[arg(long, default_value = "")]
    pub body: String,

    /// Random UUID when omitted
    #[arg(long)]
    pub nonce: Option<String>,

    /// Unix seconds; now when omitted
    #[arg(long)]
    pub timestamp: Option<i64>,
}

pub fn run(args: SignArgs) -> anyhow::Result<()> {
    for (name, value) in signed_headers(&args)? {
        println!("{}: {}", name, value);
    }
    Ok(())
}

fn signed_headers(args: &SignArgs) -> anyhow::Result<Vec<(&'static str, String)>> {
    let timestamp = args
        .timestamp
        .unwrap_or_else(|| chrono::Utc::now().timestamp())
        .to_string();
    let nonce = args
        .nonce
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    let signature = sign(
        &args.secret,
        &SigningInput {
            method: &args.method,
            path: &args.path,
            timestamp: &timestamp,
            nonce: &nonce,
            body: args.body.as_bytes(),
        },
    )?;

    Ok(vec![
        (API_KEY_HEADER, args.api_key.clone()),
        (TIMESTAMP_HEADER, timestamp),
        (NONCE_HEADER, nonce),
        (SIGNATURE_HEADER, signature),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::gateway::signature::verify;

    #[test]
    fn test_signed_headers_verify() {
        let args = SignArgs {
            api_key: "ak-1".to_string(),
            secret: "0123456789abcdef".to_string(),
            method: "post".to_string(),
            path: "/blacklist/check".to_string(),
            body: r#"{"hash_value":"abc"}"#.to_string(),
            nonce: Some("n-1".to_string()),
            timestamp: Some(1_700_000_000),
        };

        let headers = signed_headers(&args).unwrap();
        assert_eq!(headers[0], (API_KEY_HEADER, "ak-1".to_string()));
        assert_eq!(headers[1], (TIMESTAMP_HEADER, "1700000000".to_string()));
        assert_eq!(headers[2], (NONCE_HEADER, "n-1".to_string()));

        let input = SigningInput {
            method: "POST",
            path: "/blacklist/check",
            timestamp: "1700000000",
            nonce: "n-1",
            body: args.body.as_bytes(),
        };
        assert!(verify("0123456789abcdef", &input, &headers[3].1));
    }

    #[test]
    fn test_generated_nonce_and_timestamp() {
        let args = SignArgs {
            api_key: "ak-1".to_string(),
            secret: "0123456789abcdef".to_string(),
            method: "POST".to_string(),
            path: "/blacklist/check".to_string(),
            body: String::new(),
            nonce: None,
            timestamp: None,
        };

        let headers = signed_headers(&args).unwrap();
        assert_eq!(headers[2].1.len(), 32);
        assert!(headers[1].1.parse::<i64>().is_ok());
    }
}
