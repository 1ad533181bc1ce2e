//! TLS configuration loading.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

/// Load a rustls server config from PEM certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> io::Result<RustlsConfig> {
    for (what, path) in [("certificate", cert_path), ("private key", key_path)] {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{what} file not found: {}", path.display()),
            ));
        }
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_certificate_is_reported() {
        let err = load_tls_config(
            Path::new("/nonexistent/server.crt"),
            Path::new("/nonexistent/server.key"),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("certificate"));
    }
}
