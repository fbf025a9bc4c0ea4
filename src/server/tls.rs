use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use log::info;
use rustls::ServerConfig;
use rustls::pki_types::{ CertificateDer, PrivateKeyDer };
use rustls_pemfile::{ certs, pkcs8_private_keys };
use tokio_rustls::TlsAcceptor;

use crate::cli::Args;

pub fn load_tls_config(
    cert_path: &str,
    key_path: &str
) -> Result<Arc<ServerConfig>, Box<dyn Error + Send + Sync>> {
    let cert_file = File::open(cert_path).map_err(|e|
        format!("Failed to open TLS certificate file '{}': {}", cert_path, e)
    )?;
    let key_file = File::open(key_path).map_err(|e|
        format!("Failed to open TLS key file '{}': {}", key_path, e)
    )?;

    let mut cert_reader = BufReader::new(cert_file);
    let mut key_reader = BufReader::new(key_file);
    let cert_chain: Vec<CertificateDer<'static>> = certs(&mut cert_reader)
        .collect::<Result<_, _>>()
        .map_err(|e| format!("Failed to read certificate(s): {}", e))?;

    let mut keys = pkcs8_private_keys(&mut key_reader);
    let key = match keys.next() {
        Some(Ok(k)) => PrivateKeyDer::Pkcs8(k),
        Some(Err(e)) => {
            return Err(format!("Error reading private key: {}", e).into());
        }
        None => {
            return Err("No PKCS8 private key found in key file".into());
        }
    };

    // Both ring and aws-lc-rs end up compiled in; pin ring.
    let _ = rustls::crypto::ring::default_provider().install_default();
    let config = ServerConfig::builder().with_no_client_auth().with_single_cert(cert_chain, key)?;
    Ok(Arc::new(config))
}

/// Builds the acceptor for WSS, or `None` when TLS is off. A half-configured
/// TLS setup is an error.
pub fn tls_acceptor(args: &Args) -> Result<Option<TlsAcceptor>, Box<dyn Error + Send + Sync>> {
    if !args.enable_tls {
        info!("TLS not enabled. Running plain WebSocket (WS) server.");
        return Ok(None);
    }
    match (&args.tls_cert_path, &args.tls_key_path) {
        (Some(cert_path), Some(key_path)) => {
            info!(
                "TLS enabled. Loading certificate from '{}' and key from '{}'",
                cert_path,
                key_path
            );
            let config = load_tls_config(cert_path, key_path)?;
            Ok(Some(TlsAcceptor::from(config)))
        }
        (Some(_), None) | (None, Some(_)) => {
            Err("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.".into())
        }
        (None, None) => Err("--enable-tls was set but no certificate/key paths provided.".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn tls_is_off_by_default() {
        let args = Args::try_parse_from(["healthcare-assistant"]).unwrap();
        assert!(tls_acceptor(&args).unwrap().is_none());
    }

    #[test]
    fn enabling_tls_without_key_fails() {
        let args = Args::try_parse_from([
            "healthcare-assistant",
            "--enable-tls",
            "--tls-cert-path",
            "cert.pem",
        ]).unwrap();
        assert!(tls_acceptor(&args).is_err());
    }

    #[test]
    fn unreadable_certificate_is_reported() {
        let err = load_tls_config("/no/such/cert.pem", "/no/such/key.pem").unwrap_err();
        assert!(err.to_string().contains("Failed to open TLS certificate file"));
    }
}
