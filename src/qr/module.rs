use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::decoder::{DecodeError, QrDecoder};
use super::native::RqrrDecoder;
use super::zbar::ZbarDecoder;
use crate::capability::Capability;
use crate::config::QrConfig;
use crate::module::{ModuleContext, ModuleError, ModuleInfo, ProcessingModule};

pub const QR_INFO: ModuleInfo = ModuleInfo {
    name: "qr_extractor",
    description: "Analyze document previews to find QR codes and decode them with two different decoders.",
    acts_on: &["png", "jpg", "jpeg", "pdf", "word", "html", "excel", "powerpoint"],
    triggered_by: Some("document_preview"),
};

/// QR code detection over rendered previews
pub struct QrModule {
    config: QrConfig,
    decoders: Vec<Arc<dyn QrDecoder>>,
    /// Decoders that could not be set up; their keys always read `null`
    unavailable: Vec<(&'static str, String)>,
}

impl QrModule {
    /// Builds the module with the in-process decoder and, when found, `zbarimg`
    pub fn initialize(config: QrConfig, zbarimg: Capability<PathBuf>) -> Result<Self, ModuleError> {
        let mut module = Self::with_decoders(config, vec![Arc::new(RqrrDecoder::new()) as Arc<dyn QrDecoder>]);
        match zbarimg {
            Capability::Available(binary) => module.decoders.push(Arc::new(ZbarDecoder::new(binary))),
            Capability::Missing { dependency, hint } => {
                warn!(module = QR_INFO.name, dependency, hint = %hint, "Decoder unavailable");
                module.unavailable.push(("zbar", hint));
            }
        }
        Ok(module)
    }

    pub fn with_decoders(config: QrConfig, decoders: Vec<Arc<dyn QrDecoder>>) -> Self {
        Self {
            config,
            decoders,
            unavailable: Vec::new(),
        }
    }

    pub fn decoder_names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    async fn run_decoder(decoder: Arc<dyn QrDecoder>, target: PathBuf) -> Result<Vec<String>, DecodeError> {
        let name = decoder.name();
        tokio::task::spawn_blocking(move || decoder.decode(&target))
            .await
            .unwrap_or_else(|e| Err(DecodeError::Failed(format!("{} task failed: {}", name, e))))
    }
}

/// Turns a decoded value into a URL IOC when it is one
///
/// Bare hostnames (`evil.example/path`) are promoted to `http://` URLs.
pub fn url_ioc(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return None;
    }

    if let Ok(url) = Url::parse(value) {
        return matches!(url.scheme(), "http" | "https" | "ftp")
            .then(|| url.to_string());
    }

    let host = value.split(['/', '?', '#']).next().unwrap_or_default();
    if !host.contains('.') || host.starts_with('.') || host.ends_with('.') {
        return None;
    }
    Url::parse(&format!("http://{}", value))
        .ok()
        .filter(|u| u.host_str().is_some())
        .map(|u| u.to_string())
}

#[async_trait]
impl ProcessingModule for QrModule {
    fn info(&self) -> &ModuleInfo {
        &QR_INFO
    }

    async fn each(&self, target: &Path, ctx: &mut ModuleContext) -> Result<bool, ModuleError> {
        let mut decoded: Vec<String> = Vec::new();

        for decoder in &self.decoders {
            let name = decoder.name();
            match Self::run_decoder(Arc::clone(decoder), target.to_path_buf()).await {
                Ok(values) => {
                    debug!(decoder = name, count = values.len(), "QR codes decoded");
                    decoded.extend(values.iter().cloned());
                    ctx.set_result(name, json!(values));
                }
                Err(e) => {
                    if e.is_not_found() {
                        debug!(decoder = name, "No QR code found");
                    } else {
                        warn!(decoder = name, error = %e, "QR decoder failed");
                    }
                    ctx.set_result(name, Value::Null);
                }
            }
        }
        for (name, hint) in &self.unavailable {
            debug!(decoder = *name, hint = %hint, "Skipping unavailable decoder");
            ctx.set_result(*name, Value::Null);
        }

        for value in &decoded {
            if let Some(ioc) = url_ioc(value) {
                ctx.add_ioc(ioc);
            }
        }

        let found = !decoded.is_empty();
        if !found && self.config.skip_safe_file_review {
            ctx.skip_review();
        }
        info!(target = %target.display(), codes = decoded.len(), "QR scan finished");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDecoder {
        name: &'static str,
        result: Result<Vec<String>, DecodeError>,
    }

    impl QrDecoder for FixedDecoder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn decode(&self, _image: &Path) -> Result<Vec<String>, DecodeError> {
            self.result.clone()
        }
    }

    struct PanickingDecoder;

    impl QrDecoder for PanickingDecoder {
        fn name(&self) -> &'static str {
            "panicky"
        }

        fn decode(&self, _image: &Path) -> Result<Vec<String>, DecodeError> {
            panic!("decoder blew up")
        }
    }

    fn fixed(name: &'static str, result: Result<Vec<String>, DecodeError>) -> Arc<dyn QrDecoder> {
        Arc::new(FixedDecoder { name, result })
    }

    #[tokio::test]
    async fn test_results_per_decoder() {
        let module = QrModule::with_decoders(
            QrConfig::default(),
            vec![
                fixed("rqrr", Ok(vec!["https://phish.example/login".to_string()])),
                fixed("zbar", Err(DecodeError::Failed("crashed".to_string()))),
            ],
        );
        let mut ctx = ModuleContext::new();

        let found = module.each(Path::new("/tmp/preview.png"), &mut ctx).await.unwrap();

        assert!(found);
        assert_eq!(ctx.result("rqrr"), Some(&json!(["https://phish.example/login"])));
        assert_eq!(ctx.result("zbar"), Some(&Value::Null));
        assert_eq!(ctx.iocs, vec!["https://phish.example/login"]);
    }

    #[tokio::test]
    async fn test_duplicate_urls_single_ioc() {
        let url = "http://evil.example/a".to_string();
        let module = QrModule::with_decoders(
            QrConfig::default(),
            vec![fixed("rqrr", Ok(vec![url.clone()])), fixed("zbar", Ok(vec![url.clone()]))],
        );
        let mut ctx = ModuleContext::new();
        module.each(Path::new("/tmp/preview.png"), &mut ctx).await.unwrap();

        assert_eq!(ctx.iocs, vec![url]);
    }

    #[tokio::test]
    async fn test_panicking_decoder_is_swallowed() {
        let module = QrModule::with_decoders(QrConfig::default(), vec![Arc::new(PanickingDecoder) as Arc<dyn QrDecoder>]);
        let mut ctx = ModuleContext::new();

        let found = module.each(Path::new("/tmp/preview.png"), &mut ctx).await.unwrap();
        assert!(!found);
        assert_eq!(ctx.result("panicky"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_skip_review_when_nothing_found() {
        let config = QrConfig {
            skip_safe_file_review: true,
        };
        let module = QrModule::with_decoders(config, vec![fixed("rqrr", Err(DecodeError::NotFound))]);
        let mut ctx = ModuleContext::new();
        module.each(Path::new("/tmp/preview.png"), &mut ctx).await.unwrap();
        assert!(ctx.review_skipped);
    }

    #[tokio::test]
    async fn test_review_kept_by_default() {
        let module = QrModule::with_decoders(
            QrConfig::default(),
            vec![fixed("rqrr", Err(DecodeError::NotFound))],
        );
        let mut ctx = ModuleContext::new();
        module.each(Path::new("/tmp/preview.png"), &mut ctx).await.unwrap();
        assert!(!ctx.review_skipped);
    }

    #[tokio::test]
    async fn test_missing_zbar_records_null() {
        let module = QrModule::initialize(
            QrConfig::default(),
            Capability::missing("zbarimg", "zbarimg not found on PATH"),
        )
        .unwrap();
        assert_eq!(module.decoder_names(), vec!["rqrr"]);

        let mut ctx = ModuleContext::new();
        module
            .each(Path::new("/nonexistent/preview.png"), &mut ctx)
            .await
            .unwrap();
        assert_eq!(ctx.result("rqrr"), Some(&Value::Null));
        assert_eq!(ctx.result("zbar"), Some(&Value::Null));
    }

    #[test]
    fn test_url_ioc() {
        assert_eq!(
            url_ioc("https://phish.example/login?x=1").as_deref(),
            Some("https://phish.example/login?x=1")
        );
        assert_eq!(
            url_ioc("phish.example/login").as_deref(),
            Some("http://phish.example/login")
        );
        assert_eq!(url_ioc("WIFI:S:home;T:WPA;P:secret;;"), None);
        assert_eq!(url_ioc("hello world"), None);
        assert_eq!(url_ioc("mailto:a@b.example"), None);
        assert_eq!(url_ioc("1234"), None);
        assert_eq!(url_ioc(""), None);
    }

    #[test]
    fn test_metadata() {
        assert_eq!(QR_INFO.triggered_by, Some("document_preview"));
        assert!(QR_INFO.accepts("png"));
        assert!(!QR_INFO.accepts("zip"));
    }
}
