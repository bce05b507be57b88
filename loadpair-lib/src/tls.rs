use std::path::{Path, PathBuf};

use rama::{
    error::{BoxError, ErrorContext as _},
    net::tls::{
        ApplicationProtocol, DataEncoding,
        server::{SelfSignedData, ServerAuth, ServerAuthData, ServerConfig},
    },
    telemetry::tracing,
    tls::boring::server::{TlsAcceptorData, TlsAcceptorLayer},
    utils::str::NonEmptyStr,
};

/// Source of the certificate used by a secure listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsConfig {
    /// A certificate generated at startup, valid for the lifetime of the process.
    SelfSigned,
    /// PEM encoded certificate chain and private key loaded from disk.
    Files { cert: PathBuf, key: PathBuf },
}

impl TlsConfig {
    /// Both paths or none must be given;
    /// without paths a self-signed certificate is used.
    pub fn try_from_paths(cert: Option<PathBuf>, key: Option<PathBuf>) -> Result<Self, BoxError> {
        match (cert, key) {
            (Some(cert), Some(key)) => Ok(Self::Files { cert, key }),
            (None, None) => Ok(Self::SelfSigned),
            (Some(cert), None) => Err(BoxError::from(format!(
                "tls certificate '{}' given without private key",
                cert.display()
            ))),
            (None, Some(key)) => Err(BoxError::from(format!(
                "tls private key '{}' given without certificate",
                key.display()
            ))),
        }
    }
}

/// Create the acceptor layer for a secure listener,
/// negotiating `h2` or `http/1.1` over ALPN.
pub async fn new_tls_acceptor_layer(cfg: &TlsConfig) -> Result<TlsAcceptorLayer, BoxError> {
    let auth = match cfg {
        TlsConfig::SelfSigned => {
            tracing::info!("tls: use self-signed server certificate");
            ServerAuth::SelfSigned(SelfSignedData {
                organisation_name: Some("loadpair target".to_owned()),
                ..Default::default()
            })
        }
        TlsConfig::Files { cert, key } => {
            tracing::info!(
                cert = %cert.display(),
                key = %key.display(),
                "tls: load server certificate and key from disk",
            );
            ServerAuth::Single(ServerAuthData {
                private_key: DataEncoding::Pem(read_pem_file(key).await?),
                cert_chain: DataEncoding::Pem(read_pem_file(cert).await?),
                ocsp: None,
            })
        }
    };

    let tls_acceptor_data: TlsAcceptorData = ServerConfig {
        application_layer_protocol_negotiation: Some(vec![
            ApplicationProtocol::HTTP_2,
            ApplicationProtocol::HTTP_11,
        ]),
        ..ServerConfig::new(auth)
    }
    .try_into()
    .context("create tls acceptor data")?;

    Ok(TlsAcceptorLayer::new(tls_acceptor_data))
}

async fn read_pem_file(path: &Path) -> Result<NonEmptyStr, BoxError> {
    tokio::fs::read_to_string(path)
        .await
        .context("read PEM file")
        .with_context_debug_field("path", || path.to_owned())?
        .try_into()
        .context("PEM file content as NonEmpty variant")
        .with_context_debug_field("path", || path.to_owned())
}
